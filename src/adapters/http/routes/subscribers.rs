use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::subscription_status::SubscriptionStatus,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/{user_id}/subscription", get(get_subscription))
}

#[derive(Serialize)]
struct SubscriptionResponse {
    subscription_status: SubscriptionStatus,
    has_access: bool,
    trial_end_date: Option<DateTime<Utc>>,
    subscription_created_at: Option<DateTime<Utc>>,
    subscription_canceled_at: Option<DateTime<Utc>>,
}

/// GET /api/subscribers/{user_id}/subscription
async fn get_subscription(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let profile = app_state
        .subscription_sync_use_cases
        .get_subscriber(user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(SubscriptionResponse {
        subscription_status: profile.subscription_status,
        has_access: profile.subscription_status.has_access(),
        trial_end_date: profile.trial_end_date,
        subscription_created_at: profile.subscription_created_at,
        subscription_canceled_at: profile.subscription_canceled_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use std::sync::Arc;

    use crate::test_utils::{InMemorySubscriberRepo, TestAppStateBuilder, create_test_subscriber};

    fn server_with(repo: Arc<InMemorySubscriberRepo>) -> TestServer {
        let app_state = TestAppStateBuilder::new().with_subscriber_repo(repo).build();
        TestServer::new(router().with_state(app_state)).unwrap()
    }

    #[tokio::test]
    async fn returns_stored_status() {
        let user = create_test_subscriber(|s| s.subscription_status = SubscriptionStatus::Trialing);
        let server = server_with(Arc::new(InMemorySubscriberRepo::with_subscribers(vec![
            user.clone(),
        ])));

        let response = server
            .get(&format!("/{}/subscription", user.user_id))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["subscription_status"], "trialing");
        assert_eq!(body["has_access"], true);
    }

    #[tokio::test]
    async fn unknown_subscriber_is_404() {
        let server = server_with(Arc::new(InMemorySubscriberRepo::new()));

        let response = server
            .get(&format!("/{}/subscription", Uuid::new_v4()))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}
