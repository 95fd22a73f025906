//! Decodes verified processor webhook bodies into [`BillingEvent`]s.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::billing_event::{
        BillingEvent, BillingEventKind, InvoiceSnapshot, SubscriptionSnapshot,
    },
};

#[derive(Debug, Deserialize)]
struct StripeEventEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: Value,
}

/// Convert a Unix timestamp to a UTC datetime
fn timestamp_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

fn field_timestamp(object: &Value, field: &str) -> Option<DateTime<Utc>> {
    object[field].as_i64().and_then(timestamp_to_utc)
}

/// Reads an id that may be either a bare string or an expanded object.
fn expandable_id(value: &Value) -> Option<String> {
    value
        .as_str()
        .or_else(|| value["id"].as_str())
        .map(str::to_string)
}

fn metadata_user_id(object: &Value) -> Option<&str> {
    object["metadata"]["user_id"].as_str()
}

/// Finds the internal user id the foreign object was tagged with.
fn correlation_key(event_type: &str, object: &Value) -> Option<Uuid> {
    let raw = metadata_user_id(object)
        .or_else(|| object["client_reference_id"].as_str())
        .or_else(|| metadata_user_id(&object["subscription_details"]))
        .or_else(|| metadata_user_id(&object["parent"]["subscription_details"]))
        .or_else(|| metadata_user_id(&object["subscription"]))?;

    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::debug!(event_type, user_id = raw, "Invalid user_id format in metadata");
            None
        }
    }
}

fn subscription_snapshot(object: &Value) -> SubscriptionSnapshot {
    SubscriptionSnapshot {
        status: object["status"].as_str().unwrap_or("").to_string(),
        trial_end: field_timestamp(object, "trial_end"),
        started_at: field_timestamp(object, "start_date")
            .or_else(|| field_timestamp(object, "created")),
        canceled_at: field_timestamp(object, "canceled_at")
            .or_else(|| field_timestamp(object, "ended_at")),
    }
}

/// Checkout sessions only embed the subscription when it was expanded.
/// Otherwise a paid session starts an active subscription and a session that
/// required no payment starts a trial.
fn checkout_snapshot(session: &Value) -> SubscriptionSnapshot {
    let subscription = &session["subscription"];
    if subscription.is_object() {
        return subscription_snapshot(subscription);
    }

    let status = match session["payment_status"].as_str() {
        Some("no_payment_required") => "trialing",
        _ => "active",
    };
    SubscriptionSnapshot {
        status: status.to_string(),
        trial_end: None,
        started_at: field_timestamp(session, "created"),
        canceled_at: None,
    }
}

fn invoice_snapshot(invoice: &Value) -> InvoiceSnapshot {
    InvoiceSnapshot {
        invoice_id: invoice["id"].as_str().map(str::to_string),
        attempt_count: invoice["attempt_count"]
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
    }
}

fn invoice_subscription_id(invoice: &Value) -> Option<String> {
    expandable_id(&invoice["subscription"])
        .or_else(|| expandable_id(&invoice["parent"]["subscription_details"]["subscription"]))
}

/// Parses a verified body into a typed event.
///
/// Unrecognized event types decode to [`BillingEventKind::Unknown`]; only a
/// body that is not an event envelope at all is an error.
pub fn decode_event(body: &str) -> AppResult<BillingEvent> {
    let envelope: StripeEventEnvelope = serde_json::from_str(body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

    let occurred_at = timestamp_to_utc(envelope.created)
        .ok_or_else(|| AppError::InvalidInput("Invalid event timestamp".into()))?;
    let object = envelope.data.object;

    let (kind, foreign_subscription_id) = match envelope.event_type.as_str() {
        "customer.subscription.created" => (
            BillingEventKind::SubscriptionCreated(subscription_snapshot(&object)),
            expandable_id(&object["id"]),
        ),
        "customer.subscription.updated" => (
            BillingEventKind::SubscriptionUpdated(subscription_snapshot(&object)),
            expandable_id(&object["id"]),
        ),
        "customer.subscription.deleted" => (
            BillingEventKind::SubscriptionDeleted(subscription_snapshot(&object)),
            expandable_id(&object["id"]),
        ),
        "customer.subscription.trial_will_end" => (
            BillingEventKind::SubscriptionTrialWillEnd(subscription_snapshot(&object)),
            expandable_id(&object["id"]),
        ),
        // invoice.paid is the newer name some accounts are configured with
        "invoice.payment_succeeded" | "invoice.paid" => (
            BillingEventKind::InvoicePaymentSucceeded(invoice_snapshot(&object)),
            invoice_subscription_id(&object),
        ),
        "invoice.payment_failed" => (
            BillingEventKind::InvoicePaymentFailed(invoice_snapshot(&object)),
            invoice_subscription_id(&object),
        ),
        "checkout.session.completed" => (
            BillingEventKind::CheckoutSessionCompleted(checkout_snapshot(&object)),
            expandable_id(&object["subscription"]),
        ),
        other => (BillingEventKind::Unknown(other.to_string()), None),
    };

    Ok(BillingEvent {
        user_id: correlation_key(&envelope.event_type, &object),
        foreign_customer_id: expandable_id(&object["customer"]),
        id: envelope.id,
        kind,
        foreign_subscription_id,
        occurred_at,
        payload: object,
    })
}
