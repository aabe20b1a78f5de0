use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    db::bot_visit_repository::{BotVisitRepository, HourlyFilter, NewBotVisit},
    services::{
        bot_rollup::{bot_category, MAX_VISITS_PER_CALL},
        visibility,
    },
    utils::{auth::ApiUser, datetime::parse_rfc3339},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct BotVisitBatch {
    pub domain: String,
    pub visits: Vec<BotVisitEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BotVisitEntry {
    pub bot_name: String,
    #[serde(default)]
    pub bot_category: Option<String>,
    pub path: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

pub async fn ingest_bot_visits(
    State(state): State<AppState>,
    ApiUser { user_id }: ApiUser,
    Json(batch): Json<BotVisitBatch>,
) -> impl IntoResponse {
    if batch.domain.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "domain is required"})),
        )
            .into_response();
    }

    if batch.visits.len() > MAX_VISITS_PER_CALL {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("at most {} visits per call", MAX_VISITS_PER_CALL)
            })),
        )
            .into_response();
    }

    let domain = batch.domain.trim().to_string();
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for visit in batch.visits {
        // Unknown bot names are dropped, not errored.
        let Some(registry_category) = bot_category(&visit.bot_name) else {
            dropped += 1;
            continue;
        };

        rows.push(NewBotVisit {
            user_id,
            domain: domain.clone(),
            bot_name: visit.bot_name,
            bot_category: visit
                .bot_category
                .unwrap_or_else(|| registry_category.to_string()),
            path: visit.path,
            visited_at: visit
                .timestamp
                .as_deref()
                .and_then(parse_rfc3339)
                .unwrap_or_else(OffsetDateTime::now_utc),
        });
    }

    let accepted = rows.len();

    if let Err(e) = BotVisitRepository::new(&state.db).insert_batch(&rows).await {
        tracing::error!("Failed to insert bot visits for {}: {:?}", domain, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Failed to store visits"})),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({ "accepted": accepted, "dropped": dropped })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct HourlyQuery {
    pub domain: String,
    pub bot_name: Option<String>,
    pub bot_category: Option<String>,
    pub path: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Hourly aggregates with any combination of optional filters; the filter
/// set is composed into one query instead of one statement per combination.
pub async fn query_bot_visits(
    State(state): State<AppState>,
    ApiUser { user_id }: ApiUser,
    Query(query): Query<HourlyQuery>,
) -> impl IntoResponse {
    let filter = HourlyFilter {
        user_id,
        domain: query.domain,
        bot_name: query.bot_name,
        bot_category: query.bot_category,
        path: query.path,
        from: query.from.as_deref().and_then(parse_rfc3339),
        to: query.to.as_deref().and_then(parse_rfc3339),
    };

    match BotVisitRepository::new(&state.db).query_hourly(&filter).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            tracing::error!("Hourly bot visit query failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to query visits"})),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VisibilityQuery {
    pub domain: String,
    pub days: Option<u32>,
}

pub async fn visibility_score(
    State(state): State<AppState>,
    ApiUser { user_id }: ApiUser,
    Query(query): Query<VisibilityQuery>,
) -> impl IntoResponse {
    let days = query.days.unwrap_or(7);
    if days != 7 && days != 30 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "days must be 7 or 30"})),
        )
            .into_response();
    }

    match visibility::score_domain(&state.db, user_id, query.domain.trim(), days).await {
        Ok(score) => (StatusCode::OK, Json(score)).into_response(),
        Err(e) => {
            tracing::error!("Visibility score failed for {}: {:?}", query.domain, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to compute score"})),
            )
                .into_response()
        }
    }
}
