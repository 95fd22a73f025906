use crate::{
    adapters::http::app_state::AppState,
    application::change_feed::ChangeFeed,
    infra::{config::AppConfig, postgres_persistence},
    use_cases::subscription_sync::{ProcessedEventRepo, SubscriberRepo, SubscriptionSyncUseCases},
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET is not set, every webhook will be rejected");
    }

    // Pool waits are bounded by the request timeout so a stuck store fails the
    // request instead of holding it past the processor's retry window.
    let postgres_arc = Arc::new(
        postgres_persistence(
            &config.database_url,
            config.database_max_connections,
            config.request_timeout / 2,
        )
        .await?,
    );

    let subscriber_repo_arc = postgres_arc.clone() as Arc<dyn SubscriberRepo>;
    let processed_event_repo_arc = postgres_arc.clone() as Arc<dyn ProcessedEventRepo>;
    let change_feed = ChangeFeed::default();

    let subscription_sync_use_cases = SubscriptionSyncUseCases::new(
        subscriber_repo_arc,
        processed_event_repo_arc,
        change_feed.clone(),
    );

    Ok(AppState {
        config: Arc::new(config),
        subscription_sync_use_cases: Arc::new(subscription_sync_use_cases),
        change_feed,
    })
}

pub fn init_tracing(log_file: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "subscription_sync=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don’t show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs), skipped if the file can't be created
    let json_layer = log_file
        .and_then(|path| match File::create(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("cannot create log file {path}: {e}");
                None
            }
        })
        .map(|file| {
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(true)
                .with_span_list(true)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
