use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use crate::{
    models::health::{HealthCheck, HealthCheckPayload},
    services::heartbeat,
    utils::auth::ApiUser,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub domain: String,
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub checks: Option<HashMap<String, HealthCheck>>,
}

pub async fn push_heartbeat(
    State(state): State<AppState>,
    ApiUser { user_id }: ApiUser,
    Json(req): Json<HeartbeatRequest>,
) -> impl IntoResponse {
    if req.domain.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "domain is required"})),
        )
            .into_response();
    }

    if !matches!(req.status.as_str(), "ok" | "error" | "degraded") {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "status must be ok, error or degraded"})),
        )
            .into_response();
    }

    let payload = HealthCheckPayload {
        status: req.status,
        checks: req.checks,
    };

    match heartbeat::record_heartbeat(&state.db, &state.http, user_id, req.domain.trim(), &payload).await {
        Ok(status) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": status.as_str() })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to record heartbeat for {}: {:?}", req.domain, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to record heartbeat"})),
            )
                .into_response()
        }
    }
}
