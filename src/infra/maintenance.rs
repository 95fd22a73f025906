use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{Receiver, error::RecvError};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::{
    application::change_feed::SubscriptionChange,
    use_cases::subscription_sync::SubscriptionSyncUseCases,
};

/// Periodically forgets processed event ids that fell out of the dedupe window.
pub async fn run_processed_event_sweep_loop(
    use_cases: Arc<SubscriptionSyncUseCases>,
    sweep_interval: Duration,
    retention: chrono::Duration,
) {
    let mut ticker = interval(sweep_interval);

    info!(
        "Processed event sweeper started (every {}s, retention {}h)",
        sweep_interval.as_secs(),
        retention.num_hours()
    );

    loop {
        ticker.tick().await;

        match use_cases.purge_processed_events(retention).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Purged expired processed events"),
            Err(e) => error!(error = ?e, "Failed to purge processed events"),
        }
    }
}

/// Logs every subscriber status change published on the change feed.
pub async fn run_change_log_loop(mut changes: Receiver<SubscriptionChange>) {
    loop {
        match changes.recv().await {
            Ok(change) => info!(
                user_id = %change.user_id,
                status = %change.status,
                has_access = change.status.has_access(),
                event_id = %change.event_id,
                "Subscription status changed"
            ),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Change log fell behind, some changes were not logged")
            }
            Err(RecvError::Closed) => break,
        }
    }
}
