//! Processor webhook signatures: `t=<unix>,v1=<hex hmac-sha256 of "t.body">`.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::app_error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

pub fn sign_payload(secret: &str, timestamp: i64, body: &str) -> AppResult<String> {
    let signature = compute_signature(secret, timestamp, body)?;
    Ok(format!("t={},v1={}", timestamp, signature))
}

fn compute_signature(secret: &str, timestamp: i64, body: &str) -> AppResult<String> {
    let signed_content = format!("{}.{}", timestamp, body);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(signed_content.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a webhook body against its signature header.
///
/// This is the only trust boundary; nothing downstream may look at an
/// unverified body. A zero `tolerance` disables the timestamp check.
pub fn verify_signature(
    payload: &str,
    signature_header: Option<&str>,
    webhook_secret: Option<&str>,
    tolerance: Duration,
) -> AppResult<()> {
    verify_signature_at(payload, signature_header, webhook_secret, tolerance, Utc::now())
}

pub fn verify_signature_at(
    payload: &str,
    signature_header: Option<&str>,
    webhook_secret: Option<&str>,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let webhook_secret = webhook_secret
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Authentication("Webhook secret not configured".into()))?;
    let signature_header = signature_header
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Authentication("Missing signature header".into()))?;

    // Parse signature header: "t=timestamp,v1=signature,..."
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp: i64 = timestamp
        .ok_or_else(|| AppError::Authentication("Missing timestamp in signature".into()))?
        .parse()
        .map_err(|_| AppError::Authentication("Invalid timestamp".into()))?;

    if signatures.is_empty() {
        return Err(AppError::Authentication("Missing v1 signature".into()));
    }

    let expected = compute_signature(webhook_secret, timestamp, payload)?;
    if !signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        return Err(AppError::Authentication("Invalid signature".into()));
    }

    if tolerance > Duration::zero()
        && now.timestamp().abs_diff(timestamp) > tolerance.num_seconds().unsigned_abs()
    {
        return Err(AppError::Authentication(
            "Timestamp outside tolerance".into(),
        ));
    }

    Ok(())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
