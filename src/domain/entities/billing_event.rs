use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A verified, decoded processor event. Never mutated after decoding.
#[derive(Debug, Clone)]
pub struct BillingEvent {
    pub id: String,
    pub kind: BillingEventKind,
    pub foreign_subscription_id: Option<String>,
    pub foreign_customer_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Correlation key taken from the foreign object's metadata.
    pub user_id: Option<Uuid>,
    pub payload: serde_json::Value,
}

impl BillingEvent {
    pub fn event_type(&self) -> &str {
        self.kind.event_type()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BillingEventKind {
    SubscriptionCreated(SubscriptionSnapshot),
    SubscriptionUpdated(SubscriptionSnapshot),
    SubscriptionDeleted(SubscriptionSnapshot),
    SubscriptionTrialWillEnd(SubscriptionSnapshot),
    InvoicePaymentSucceeded(InvoiceSnapshot),
    InvoicePaymentFailed(InvoiceSnapshot),
    CheckoutSessionCompleted(SubscriptionSnapshot),
    /// Any event type this service does not route. Carries the raw type string.
    Unknown(String),
}

impl BillingEventKind {
    pub fn event_type(&self) -> &str {
        match self {
            BillingEventKind::SubscriptionCreated(_) => "customer.subscription.created",
            BillingEventKind::SubscriptionUpdated(_) => "customer.subscription.updated",
            BillingEventKind::SubscriptionDeleted(_) => "customer.subscription.deleted",
            BillingEventKind::SubscriptionTrialWillEnd(_) => {
                "customer.subscription.trial_will_end"
            }
            BillingEventKind::InvoicePaymentSucceeded(_) => "invoice.payment_succeeded",
            BillingEventKind::InvoicePaymentFailed(_) => "invoice.payment_failed",
            BillingEventKind::CheckoutSessionCompleted(_) => "checkout.session.completed",
            BillingEventKind::Unknown(event_type) => event_type,
        }
    }
}

/// Subscription state as reported by the processor inside the event itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionSnapshot {
    pub status: String,
    pub trial_end: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl SubscriptionSnapshot {
    /// Whether the trial is still running at `at`.
    pub fn trial_end_after(&self, at: DateTime<Utc>) -> bool {
        self.trial_end.is_some_and(|end| end > at)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceSnapshot {
    pub invoice_id: Option<String>,
    pub attempt_count: u32,
}
