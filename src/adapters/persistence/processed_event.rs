use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_sync::ProcessedEventRepo,
};

#[async_trait]
impl ProcessedEventRepo for PostgresPersistence {
    async fn is_processed(&self, event_id: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM processed_webhook_events WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(exists)
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        event_type: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO processed_webhook_events (event_id, event_type, user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(user_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM processed_webhook_events WHERE processed_at < $1")
            .bind(cutoff)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
