//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    domain::entities::{
        billing_event::{BillingEvent, BillingEventKind, SubscriptionSnapshot},
        subscriber::SubscriberProfile,
        subscription_status::SubscriptionStatus,
    },
    infra::webhook_signature::sign_payload,
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Create a test subscriber on the free tier with no processor history.
pub fn create_test_subscriber(
    overrides: impl FnOnce(&mut SubscriberProfile),
) -> SubscriberProfile {
    let mut subscriber = SubscriberProfile {
        user_id: Uuid::new_v4(),
        subscription_status: SubscriptionStatus::Free,
        trial_end_date: None,
        subscription_created_at: None,
        subscription_canceled_at: None,
        last_event_at: None,
    };
    overrides(&mut subscriber);
    subscriber
}

/// Create a decoded event occurring at [`test_datetime`].
pub fn create_test_event(
    user_id: Option<Uuid>,
    kind: BillingEventKind,
    overrides: impl FnOnce(&mut BillingEvent),
) -> BillingEvent {
    let mut event = BillingEvent {
        id: format!("evt_{}", Uuid::new_v4().simple()),
        kind,
        foreign_subscription_id: Some("sub_test".to_string()),
        foreign_customer_id: Some("cus_test".to_string()),
        occurred_at: test_datetime(),
        user_id,
        payload: serde_json::json!({}),
    };
    overrides(&mut event);
    event
}

pub fn subscription_snapshot(
    status: &str,
    trial_end: Option<DateTime<Utc>>,
) -> SubscriptionSnapshot {
    SubscriptionSnapshot {
        status: status.to_string(),
        trial_end,
        started_at: None,
        canceled_at: None,
    }
}

/// Build a raw processor event body as it arrives on the wire.
pub fn stripe_event_body(
    event_id: &str,
    event_type: &str,
    created: DateTime<Utc>,
    object: serde_json::Value,
) -> String {
    serde_json::json!({
        "id": event_id,
        "object": "event",
        "type": event_type,
        "created": created.timestamp(),
        "data": { "object": object },
    })
    .to_string()
}

/// A subscription object carrying `user_id` in its metadata.
pub fn stripe_subscription_object(
    user_id: Uuid,
    status: &str,
    trial_end: Option<DateTime<Utc>>,
) -> serde_json::Value {
    serde_json::json!({
        "id": "sub_test",
        "object": "subscription",
        "customer": "cus_test",
        "status": status,
        "created": test_datetime().timestamp(),
        "trial_end": trial_end.map(|t| t.timestamp()),
        "canceled_at": null,
        "metadata": { "user_id": user_id.to_string() },
    })
}

/// Signature header valid right now for `body` under [`TEST_WEBHOOK_SECRET`].
pub fn signed_header(body: &str) -> String {
    sign_payload(TEST_WEBHOOK_SECRET, Utc::now().timestamp(), body).unwrap()
}

/// Fixed timestamp for deterministic tests.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}
