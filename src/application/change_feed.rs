//! Publish/subscribe channel for subscriber status changes.
//!
//! Owned by `AppState` and handed to whoever needs it; consumers call
//! [`ChangeFeed::subscribe`] instead of polling the store.

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::entities::subscription_status::SubscriptionStatus;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionChange {
    pub user_id: Uuid,
    pub status: SubscriptionStatus,
    pub event_id: String,
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<SubscriptionChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubscriptionChange> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers that received the change.
    pub fn publish(&self, change: SubscriptionChange) -> usize {
        // No receivers is fine; nobody is listening yet.
        self.sender.send(change).unwrap_or(0)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
