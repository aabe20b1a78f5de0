use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::{db::api_token_repository::ApiTokenRepository, AppState};

/// Authenticated caller of the push APIs, resolved from a bearer API token.
#[derive(Debug)]
pub struct ApiUser {
    pub user_id: u64,
}

#[async_trait]
impl FromRequestParts<AppState> for ApiUser {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Extract Authorization header manually
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(StatusCode::UNAUTHORIZED)?
            .to_str()
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        // Must start with "Bearer "
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let repo = ApiTokenRepository::new(&state.db);
        let user_id = repo
            .resolve(token)
            .await
            .map_err(|e| {
                tracing::error!("Failed to look up API token: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(ApiUser { user_id })
    }
}
