//! In-memory mock implementations for the subscription repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::subscription_sync::{
        ProcessedEventRepo, SubscriberRepo, SubscriberUpdate, WriteOutcome,
    },
    domain::entities::subscriber::SubscriberProfile,
};

// ============================================================================
// InMemorySubscriberRepo
// ============================================================================

/// Applies the same guard and precondition as the Postgres UPDATE, under one lock.
#[derive(Default)]
pub struct InMemorySubscriberRepo {
    pub subscribers: Mutex<HashMap<Uuid, SubscriberProfile>>,
    writes: Mutex<usize>,
    fail_writes: bool,
}

impl InMemorySubscriberRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribers(subscribers: Vec<SubscriberProfile>) -> Self {
        let map: HashMap<Uuid, SubscriberProfile> =
            subscribers.into_iter().map(|s| (s.user_id, s)).collect();
        Self {
            subscribers: Mutex::new(map),
            ..Self::default()
        }
    }

    /// Every read and write fails with a database error.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self, user_id: Uuid) -> Option<SubscriberProfile> {
        self.subscribers.lock().unwrap().get(&user_id).cloned()
    }

    /// Number of updates that actually changed a row.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl SubscriberRepo for InMemorySubscriberRepo {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<SubscriberProfile>> {
        if self.fail_writes {
            return Err(AppError::Database("connection lost".into()));
        }
        Ok(self.snapshot(user_id))
    }

    async fn update(&self, user_id: Uuid, update: &SubscriberUpdate) -> AppResult<WriteOutcome> {
        if self.fail_writes {
            return Err(AppError::Database("connection lost".into()));
        }

        let mut subscribers = self.subscribers.lock().unwrap();
        let subscriber = subscribers.get_mut(&user_id).ok_or(AppError::NotFound)?;

        if subscriber
            .last_event_at
            .is_some_and(|last| last > update.event_at)
        {
            return Ok(WriteOutcome::Stale);
        }
        if !update.only_from.is_empty()
            && !update.only_from.contains(&subscriber.subscription_status)
        {
            return Ok(WriteOutcome::PreconditionUnmet);
        }

        if let Some(status) = update.subscription_status {
            subscriber.subscription_status = status;
        }
        subscriber.trial_end_date = update.trial_end_date.apply(subscriber.trial_end_date);
        subscriber.subscription_created_at = update
            .subscription_created_at
            .apply(subscriber.subscription_created_at);
        subscriber.subscription_canceled_at = update
            .subscription_canceled_at
            .apply(subscriber.subscription_canceled_at);
        subscriber.last_event_at = Some(update.event_at);

        *self.writes.lock().unwrap() += 1;
        Ok(WriteOutcome::Applied(subscriber.clone()))
    }
}

// ============================================================================
// InMemoryProcessedEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryProcessedEventRepo {
    pub events: Mutex<HashMap<String, DateTime<Utc>>>,
    fail_all: bool,
}

impl InMemoryProcessedEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a database error.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn insert_at(&self, event_id: &str, processed_at: DateTime<Utc>) {
        self.events
            .lock()
            .unwrap()
            .insert(event_id.to_string(), processed_at);
    }
}

#[async_trait]
impl ProcessedEventRepo for InMemoryProcessedEventRepo {
    async fn is_processed(&self, event_id: &str) -> AppResult<bool> {
        if self.fail_all {
            return Err(AppError::Database("connection lost".into()));
        }
        Ok(self.events.lock().unwrap().contains_key(event_id))
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        _event_type: &str,
        _user_id: Option<Uuid>,
    ) -> AppResult<()> {
        if self.fail_all {
            return Err(AppError::Database("connection lost".into()));
        }
        self.events
            .lock()
            .unwrap()
            .entry(event_id.to_string())
            .or_insert_with(Utc::now);
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        if self.fail_all {
            return Err(AppError::Database("connection lost".into()));
        }
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|_, processed_at| *processed_at >= cutoff);
        Ok((before - events.len()) as u64)
    }
}
