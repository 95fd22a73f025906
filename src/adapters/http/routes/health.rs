use axum::{Json, Router, routing::get};

use crate::adapters::http::app_state::AppState;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
