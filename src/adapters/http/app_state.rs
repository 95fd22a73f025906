use std::sync::Arc;

use crate::{
    application::change_feed::ChangeFeed, infra::config::AppConfig,
    use_cases::subscription_sync::SubscriptionSyncUseCases,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub subscription_sync_use_cases: Arc<SubscriptionSyncUseCases>,
    pub change_feed: ChangeFeed,
}
