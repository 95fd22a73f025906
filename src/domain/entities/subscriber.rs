use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::subscription_status::SubscriptionStatus;

/// Internal view of a subscriber. Created at sign-up, never deleted;
/// cancellation is a status, not a removal.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberProfile {
    pub user_id: Uuid,
    pub subscription_status: SubscriptionStatus,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub subscription_created_at: Option<DateTime<Utc>>,
    pub subscription_canceled_at: Option<DateTime<Utc>>,
    /// `occurred_at` of the newest processor event applied to this row.
    pub last_event_at: Option<DateTime<Utc>>,
}
