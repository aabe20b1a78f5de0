use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    db::{
        incident_repository::IncidentRepository, observation_repository::ObservationRepository,
        service_repository::ServiceRepository,
    },
    utils::auth::ApiUser,
    AppState,
};

#[derive(Deserialize)]
pub struct ObservationQuery {
    pub limit: Option<u32>,
}

pub async fn list_observations(
    State(state): State<AppState>,
    ApiUser { user_id }: ApiUser,
    Path(service_id): Path<u64>,
    Query(query): Query<ObservationQuery>,
) -> impl IntoResponse {
    // Check the service belongs to the caller
    let service_repo = ServiceRepository::new(&state.db);

    match service_repo.find_owned(service_id, user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(
                "User_id {} tried to access service_id {} which is not theirs",
                user_id, service_id
            );
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"error": "Forbidden"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to verify service ownership: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    }

    let repo = ObservationRepository::new(&state.db);
    let limit = query.limit.unwrap_or(50).min(500);

    match repo.get_recent(service_id, limit).await {
        Ok(observations) => (StatusCode::OK, Json(observations)).into_response(),
        Err(e) => {
            tracing::error!(
                "Failed to fetch observations for service_id {}: {:?}",
                service_id, e
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to fetch observations"})),
            )
                .into_response()
        }
    }
}

pub async fn list_incidents(
    State(state): State<AppState>,
    ApiUser { user_id }: ApiUser,
    Path(service_id): Path<u64>,
    Query(query): Query<ObservationQuery>,
) -> impl IntoResponse {
    let service_repo = ServiceRepository::new(&state.db);

    match service_repo.find_owned(service_id, user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"error": "Forbidden"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to verify service ownership: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    }

    let limit = query.limit.unwrap_or(50).min(500);

    match IncidentRepository::new(&state.db).get_for_service(service_id, limit).await {
        Ok(incidents) => (StatusCode::OK, Json(incidents)).into_response(),
        Err(e) => {
            tracing::error!(
                "Failed to fetch incidents for service_id {}: {:?}",
                service_id, e
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to fetch incidents"})),
            )
                .into_response()
        }
    }
}
