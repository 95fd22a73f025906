pub mod billing_webhooks;
pub mod health;
pub mod subscribers;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/billing", billing_webhooks::router())
        .nest("/subscribers", subscribers::router())
        .merge(health::router())
}
