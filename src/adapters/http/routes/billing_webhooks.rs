//! Payment processor webhook handler.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use secrecy::ExposeSecret;
use tracing::{debug, error, info, warn};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppResult, is_retryable_error},
    infra::{stripe_events::decode_event, webhook_signature::verify_signature},
};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Every non-failure path answers with this. Anything other than 2xx makes the
/// processor redeliver and eventually disable the endpoint.
fn acknowledged() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "received": true })))
}

/// POST /api/billing/webhook
async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let secret = app_state
        .config
        .stripe_webhook_secret
        .as_ref()
        .map(|s| s.expose_secret());

    verify_signature(&body, signature, secret, app_state.config.webhook_tolerance)?;

    let event = match decode_event(&body) {
        Ok(event) => event,
        Err(e) => {
            // Verified but undecodable: redelivery won't fix it
            warn!(error = %e, retryable = false, "Could not decode webhook payload, acknowledging");
            return Ok(acknowledged());
        }
    };

    let event_id = event.id.as_str();
    let event_type = event.event_type();

    match app_state
        .subscription_sync_use_cases
        .reconcile(&event)
        .await
    {
        Ok(outcome) => {
            info!(event_id, event_type, ?outcome, "Webhook processed");
        }
        Err(e) if is_retryable_error(&e) => {
            error!(
                error = %e,
                event_id,
                event_type,
                retryable = true,
                "Webhook processing failed, returning 500 for processor retry"
            );
            return Err(e);
        }
        Err(e) => {
            debug!(
                error = %e,
                event_id,
                event_type,
                subscription_id = event.foreign_subscription_id.as_deref().unwrap_or("unknown"),
                customer_id = event.foreign_customer_id.as_deref().unwrap_or("unknown"),
                retryable = false,
                "Webhook not applicable, acknowledging"
            );
        }
    }

    Ok(acknowledged())
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_webhook))
}
