use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_sync::{
        ColumnWrite, SubscriberRepo, SubscriberUpdate, WriteOutcome,
    },
    domain::entities::{subscriber::SubscriberProfile, subscription_status::SubscriptionStatus},
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> SubscriberProfile {
    SubscriberProfile {
        user_id: row.get("user_id"),
        subscription_status: row.get("subscription_status"),
        trial_end_date: row.get("trial_end_date"),
        subscription_created_at: row.get("subscription_created_at"),
        subscription_canceled_at: row.get("subscription_canceled_at"),
        last_event_at: row.get("last_event_at"),
    }
}

fn write_mode<T>(write: &ColumnWrite<T>) -> &'static str {
    match write {
        ColumnWrite::Keep => "keep",
        ColumnWrite::Set(_) => "set",
        ColumnWrite::SetIfNull(_) => "set_if_null",
        ColumnWrite::Clear => "clear",
    }
}

fn write_value<T: Copy>(write: &ColumnWrite<T>) -> Option<T> {
    match write {
        ColumnWrite::Set(value) | ColumnWrite::SetIfNull(value) => Some(*value),
        ColumnWrite::Keep | ColumnWrite::Clear => None,
    }
}

const SELECT_COLS: &str = r#"
    user_id, subscription_status, trial_end_date, subscription_created_at,
    subscription_canceled_at, last_event_at
"#;

#[async_trait]
impl SubscriberRepo for PostgresPersistence {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<SubscriberProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscribers WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn update(&self, user_id: Uuid, update: &SubscriberUpdate) -> AppResult<WriteOutcome> {
        let only_from: Vec<String> = update
            .only_from
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        // `current` locks the row, so the guard, the precondition and the
        // skipped-write label below all see the same version of it.
        let row = sqlx::query(
            r#"
            WITH current AS (
                SELECT user_id, subscription_status, last_event_at
                FROM subscribers
                WHERE user_id = $1
                FOR UPDATE
            ),
            updated AS (
                UPDATE subscribers s SET
                    subscription_status = COALESCE($2, s.subscription_status),
                    trial_end_date = CASE $3::text
                        WHEN 'set' THEN $4::timestamptz
                        WHEN 'set_if_null' THEN COALESCE(s.trial_end_date, $4::timestamptz)
                        WHEN 'clear' THEN NULL
                        ELSE s.trial_end_date END,
                    subscription_created_at = CASE $5::text
                        WHEN 'set' THEN $6::timestamptz
                        WHEN 'set_if_null' THEN COALESCE(s.subscription_created_at, $6::timestamptz)
                        WHEN 'clear' THEN NULL
                        ELSE s.subscription_created_at END,
                    subscription_canceled_at = CASE $7::text
                        WHEN 'set' THEN $8::timestamptz
                        WHEN 'set_if_null' THEN COALESCE(s.subscription_canceled_at, $8::timestamptz)
                        WHEN 'clear' THEN NULL
                        ELSE s.subscription_canceled_at END,
                    last_event_at = $9,
                    updated_at = CURRENT_TIMESTAMP
                FROM current c
                WHERE s.user_id = c.user_id
                  AND (c.last_event_at IS NULL OR c.last_event_at <= $9)
                  AND (cardinality($10::text[]) = 0 OR c.subscription_status::text = ANY($10))
                RETURNING s.user_id, s.subscription_status, s.trial_end_date,
                          s.subscription_created_at, s.subscription_canceled_at, s.last_event_at
            )
            SELECT
                c.subscription_status AS current_status,
                c.last_event_at AS current_event_at,
                u.user_id, u.subscription_status, u.trial_end_date,
                u.subscription_created_at, u.subscription_canceled_at, u.last_event_at
            FROM current c
            LEFT JOIN updated u ON u.user_id = c.user_id
            "#,
        )
        .bind(user_id)
        .bind(update.subscription_status)
        .bind(write_mode(&update.trial_end_date))
        .bind(write_value(&update.trial_end_date))
        .bind(write_mode(&update.subscription_created_at))
        .bind(write_value(&update.subscription_created_at))
        .bind(write_mode(&update.subscription_canceled_at))
        .bind(write_value(&update.subscription_canceled_at))
        .bind(update.event_at)
        .bind(&only_from)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;

        let applied: Option<Uuid> = row.get("user_id");
        if applied.is_some() {
            return Ok(WriteOutcome::Applied(row_to_profile(&row)));
        }

        let last_event_at: Option<DateTime<Utc>> = row.get("current_event_at");
        let status: SubscriptionStatus = row.get("current_status");
        if last_event_at.is_some_and(|last| last > update.event_at) {
            Ok(WriteOutcome::Stale)
        } else {
            tracing::debug!(
                user_id = %user_id,
                status = %status,
                "Subscriber update precondition not met"
            );
            Ok(WriteOutcome::PreconditionUnmet)
        }
    }
}
