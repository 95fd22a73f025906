//! Test app state builder for HTTP-level integration testing.
//!
//! This module provides `TestAppStateBuilder` which creates a minimal `AppState`
//! with in-memory mocks for testing HTTP endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        change_feed::ChangeFeed,
        use_cases::subscription_sync::{
            ProcessedEventRepo, SubscriberRepo, SubscriptionSyncUseCases,
        },
    },
    infra::{config::AppConfig, webhook_signature::DEFAULT_TOLERANCE_SECS},
    test_utils::{InMemoryProcessedEventRepo, InMemorySubscriberRepo, TEST_WEBHOOK_SECRET},
};

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let repo = Arc::new(InMemorySubscriberRepo::with_subscribers(vec![subscriber]));
///
/// let app_state = TestAppStateBuilder::new()
///     .with_subscriber_repo(repo.clone())
///     .build();
/// ```
pub struct TestAppStateBuilder {
    subscriber_repo: Arc<dyn SubscriberRepo>,
    processed_event_repo: Arc<dyn ProcessedEventRepo>,
    webhook_secret: Option<String>,
    change_feed: ChangeFeed,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            subscriber_repo: Arc::new(InMemorySubscriberRepo::new()),
            processed_event_repo: Arc::new(InMemoryProcessedEventRepo::new()),
            webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
            change_feed: ChangeFeed::default(),
        }
    }

    pub fn with_subscriber_repo(mut self, repo: Arc<InMemorySubscriberRepo>) -> Self {
        self.subscriber_repo = repo;
        self
    }

    pub fn with_processed_event_repo(mut self, repo: Arc<InMemoryProcessedEventRepo>) -> Self {
        self.processed_event_repo = repo;
        self
    }

    pub fn without_webhook_secret(mut self) -> Self {
        self.webhook_secret = None;
        self
    }

    pub fn build(self) -> AppState {
        let use_cases = SubscriptionSyncUseCases::new(
            self.subscriber_repo,
            self.processed_event_repo,
            self.change_feed.clone(),
        );

        AppState {
            config: Arc::new(test_config(self.webhook_secret)),
            subscription_sync_use_cases: Arc::new(use_cases),
            change_feed: self.change_feed,
        }
    }
}

fn test_config(webhook_secret: Option<String>) -> AppConfig {
    AppConfig {
        stripe_webhook_secret: webhook_secret.map(|s| SecretString::new(s.into())),
        webhook_tolerance: chrono::Duration::seconds(DEFAULT_TOLERANCE_SECS),
        database_url: "postgres://localhost/unused".to_string(),
        database_max_connections: 1,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        request_timeout: std::time::Duration::from_secs(10),
        processed_event_retention: chrono::Duration::hours(72),
        sweep_interval: std::time::Duration::from_secs(3600),
        log_file: None,
    }
}
