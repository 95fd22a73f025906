use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::change_feed::{ChangeFeed, SubscriptionChange},
    domain::entities::{
        billing_event::{BillingEvent, BillingEventKind, SubscriptionSnapshot},
        subscriber::SubscriberProfile,
        subscription_status::SubscriptionStatus,
    },
};

// ============================================================================
// State Mapping
// ============================================================================

/// Translates the processor's subscription status into the internal lifecycle.
///
/// Total: every input maps to a status, unrecognized values fall back to `Free`.
/// `past_due` and `unpaid` stay `Active` while the processor retries the charge.
pub fn map_status(foreign_status: &str, has_trial_end_in_future: bool) -> SubscriptionStatus {
    match foreign_status {
        "active" | "trialing" if has_trial_end_in_future => SubscriptionStatus::Trialing,
        "active" => SubscriptionStatus::Active,
        // The processor says trialing; trust it even without a trial end on the event.
        "trialing" => SubscriptionStatus::Trialing,
        "past_due" | "unpaid" => SubscriptionStatus::Active,
        "canceled" | "incomplete_expired" => SubscriptionStatus::Canceled,
        _ => SubscriptionStatus::Free,
    }
}

// ============================================================================
// Types
// ============================================================================

/// How a write treats one nullable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnWrite<T> {
    Keep,
    Set(T),
    /// Fills the column only while it is NULL, so reapplying keeps the first value.
    SetIfNull(T),
    Clear,
}

impl<T: Copy> ColumnWrite<T> {
    /// `Some` overwrites, `None` leaves the column as is.
    pub fn set_or_keep(value: Option<T>) -> Self {
        value.map_or(ColumnWrite::Keep, ColumnWrite::Set)
    }

    /// `Some` overwrites, `None` clears.
    pub fn set_or_clear(value: Option<T>) -> Self {
        value.map_or(ColumnWrite::Clear, ColumnWrite::Set)
    }

    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            ColumnWrite::Keep => current,
            ColumnWrite::Set(value) => Some(value),
            ColumnWrite::SetIfNull(value) => current.or(Some(value)),
            ColumnWrite::Clear => None,
        }
    }
}

/// Sparse column set for a subscriber write.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberUpdate {
    /// `None` leaves the status untouched.
    pub subscription_status: Option<SubscriptionStatus>,
    pub trial_end_date: ColumnWrite<DateTime<Utc>>,
    pub subscription_created_at: ColumnWrite<DateTime<Utc>>,
    pub subscription_canceled_at: ColumnWrite<DateTime<Utc>>,
    /// Ordering guard: the write is skipped if the row already reflects a newer event.
    pub event_at: DateTime<Utc>,
    /// If non-empty, the write only applies when the stored status is one of these.
    pub only_from: Vec<SubscriptionStatus>,
}

impl SubscriberUpdate {
    fn at(event_at: DateTime<Utc>) -> Self {
        Self {
            subscription_status: None,
            trial_end_date: ColumnWrite::Keep,
            subscription_created_at: ColumnWrite::Keep,
            subscription_canceled_at: ColumnWrite::Keep,
            event_at,
            only_from: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Applied(SubscriberProfile),
    /// The stored row was produced by a newer event.
    Stale,
    /// The stored status is not one of `only_from`.
    PreconditionUnmet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied { status: SubscriptionStatus },
    Stale,
    PreconditionUnmet,
    /// Known event kind that is logged only.
    NoTransition,
    Duplicate,
    /// Event kind this service does not route.
    Ignored,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubscriberRepo: Send + Sync {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<SubscriberProfile>>;

    /// Column-level partial update keyed by internal user id.
    /// Returns `AppError::NotFound` when no subscriber row exists.
    async fn update(&self, user_id: Uuid, update: &SubscriberUpdate) -> AppResult<WriteOutcome>;
}

#[async_trait]
pub trait ProcessedEventRepo: Send + Sync {
    async fn is_processed(&self, event_id: &str) -> AppResult<bool>;

    async fn mark_processed(
        &self,
        event_id: &str,
        event_type: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<()>;

    /// Drops dedupe entries recorded before `cutoff`. Returns how many were removed.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct SubscriptionSyncUseCases {
    subscriber_repo: Arc<dyn SubscriberRepo>,
    processed_event_repo: Arc<dyn ProcessedEventRepo>,
    change_feed: ChangeFeed,
}

impl SubscriptionSyncUseCases {
    pub fn new(
        subscriber_repo: Arc<dyn SubscriberRepo>,
        processed_event_repo: Arc<dyn ProcessedEventRepo>,
        change_feed: ChangeFeed,
    ) -> Self {
        Self {
            subscriber_repo,
            processed_event_repo,
            change_feed,
        }
    }

    pub async fn get_subscriber(&self, user_id: Uuid) -> AppResult<Option<SubscriberProfile>> {
        self.subscriber_repo.get(user_id).await
    }

    /// Applies one verified event to the subscriber it belongs to.
    ///
    /// Every write is a projection of the event's own content, guarded by the
    /// event timestamp, so redelivery and reordering converge on the newest state.
    #[instrument(skip_all, fields(event_id = %event.id, event_type = event.event_type()))]
    pub async fn reconcile(&self, event: &BillingEvent) -> AppResult<ReconcileOutcome> {
        if let BillingEventKind::Unknown(event_type) = &event.kind {
            debug!(event_type, "Unhandled webhook event type");
            return Ok(ReconcileOutcome::Ignored);
        }

        // Attribution first: an event we can never apply must not fail on a store outage.
        let user_id = event.user_id.ok_or_else(|| {
            AppError::Unattributable(format!("event {} carries no user_id metadata", event.id))
        })?;

        if self.processed_event_repo.is_processed(&event.id).await? {
            debug!("Event already processed, skipping");
            return Ok(ReconcileOutcome::Duplicate);
        }

        let now = Utc::now();
        let outcome = match &event.kind {
            BillingEventKind::SubscriptionCreated(snapshot) => {
                let mut update = started_update(snapshot, event.occurred_at, now);
                // A new subscription object is authoritative for its trial.
                update.trial_end_date = ColumnWrite::set_or_clear(snapshot.trial_end);
                self.apply(user_id, event, &update).await?
            }
            BillingEventKind::CheckoutSessionCompleted(snapshot) => {
                // Unexpanded sessions say nothing about the trial end.
                let update = started_update(snapshot, event.occurred_at, now);
                self.apply(user_id, event, &update).await?
            }
            BillingEventKind::SubscriptionUpdated(snapshot) => {
                let status = map_status(&snapshot.status, snapshot.trial_end_after(event.occurred_at));
                let mut update = SubscriberUpdate::at(event.occurred_at);
                update.subscription_status = Some(status);
                update.trial_end_date = ColumnWrite::set_or_clear(snapshot.trial_end);
                update.subscription_canceled_at = canceled_at_write(status, snapshot, now);
                self.apply(user_id, event, &update).await?
            }
            BillingEventKind::SubscriptionDeleted(snapshot) => {
                let mut update = SubscriberUpdate::at(event.occurred_at);
                update.subscription_status = Some(SubscriptionStatus::Canceled);
                update.subscription_canceled_at =
                    canceled_at_write(SubscriptionStatus::Canceled, snapshot, now);
                self.apply(user_id, event, &update).await?
            }
            BillingEventKind::InvoicePaymentSucceeded(_) => {
                let mut update = SubscriberUpdate::at(event.occurred_at);
                update.subscription_status = Some(SubscriptionStatus::Active);
                update.only_from = vec![SubscriptionStatus::Trialing, SubscriptionStatus::Active];
                self.apply(user_id, event, &update).await?
            }
            BillingEventKind::InvoicePaymentFailed(invoice) => {
                // Dunning is left to the processor; a single failed charge keeps access.
                warn!(
                    user_id = %user_id,
                    invoice_id = invoice.invoice_id.as_deref().unwrap_or("unknown"),
                    attempt_count = invoice.attempt_count,
                    "Invoice payment failed, awaiting processor retries"
                );
                ReconcileOutcome::NoTransition
            }
            BillingEventKind::SubscriptionTrialWillEnd(snapshot) => {
                info!(
                    user_id = %user_id,
                    trial_end = ?snapshot.trial_end,
                    "Trial will end soon"
                );
                ReconcileOutcome::NoTransition
            }
            BillingEventKind::Unknown(_) => ReconcileOutcome::Ignored,
        };

        // Dedupe bookkeeping is non-critical, don't fail on it
        if let Err(e) = self
            .processed_event_repo
            .mark_processed(&event.id, event.event_type(), Some(user_id))
            .await
        {
            warn!(error = %e, "Failed to record processed event (non-critical)");
        }

        Ok(outcome)
    }

    async fn apply(
        &self,
        user_id: Uuid,
        event: &BillingEvent,
        update: &SubscriberUpdate,
    ) -> AppResult<ReconcileOutcome> {
        match self.subscriber_repo.update(user_id, update).await {
            Ok(WriteOutcome::Applied(profile)) => {
                info!(
                    user_id = %user_id,
                    status = %profile.subscription_status,
                    "Subscriber updated from webhook"
                );
                self.change_feed.publish(SubscriptionChange {
                    user_id,
                    status: profile.subscription_status,
                    event_id: event.id.clone(),
                });
                Ok(ReconcileOutcome::Applied {
                    status: profile.subscription_status,
                })
            }
            Ok(WriteOutcome::Stale) => {
                info!(
                    user_id = %user_id,
                    occurred_at = %event.occurred_at,
                    "Stale event, subscriber already reflects a newer one"
                );
                Ok(ReconcileOutcome::Stale)
            }
            Ok(WriteOutcome::PreconditionUnmet) => {
                debug!(user_id = %user_id, "Stored status does not allow this transition");
                Ok(ReconcileOutcome::PreconditionUnmet)
            }
            Err(AppError::NotFound) => Err(AppError::Unattributable(format!(
                "no subscriber with user_id {}",
                user_id
            ))),
            Err(e) => Err(e),
        }
    }

    /// Forgets processed event ids older than `retention`.
    pub async fn purge_processed_events(&self, retention: chrono::Duration) -> AppResult<u64> {
        let cutoff = Utc::now() - retention;
        self.processed_event_repo.purge_older_than(cutoff).await
    }
}

fn started_update(
    snapshot: &SubscriptionSnapshot,
    occurred_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SubscriberUpdate {
    let status = map_status(&snapshot.status, snapshot.trial_end_after(occurred_at));
    let mut update = SubscriberUpdate::at(occurred_at);
    update.subscription_status = Some(status);
    update.trial_end_date = ColumnWrite::set_or_keep(snapshot.trial_end);
    update.subscription_created_at = ColumnWrite::Set(snapshot.started_at.unwrap_or(occurred_at));
    update.subscription_canceled_at = canceled_at_write(status, snapshot, now);
    update
}

/// Only a canceled subscriber carries a cancellation time. Without one on the
/// event, the processing time is stamped once and kept on redelivery.
fn canceled_at_write(
    status: SubscriptionStatus,
    snapshot: &SubscriptionSnapshot,
    now: DateTime<Utc>,
) -> ColumnWrite<DateTime<Utc>> {
    if status != SubscriptionStatus::Canceled {
        return ColumnWrite::Clear;
    }
    match snapshot.canceled_at {
        Some(canceled_at) => ColumnWrite::Set(canceled_at),
        None => ColumnWrite::SetIfNull(now),
    }
}
