//! Secret-gated triggers for the scheduled jobs. Each invocation is a
//! one-shot bounded run that returns a JSON summary; there is no resident
//! scheduler process.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use time::OffsetDateTime;

use crate::{
    db::observation_repository::ObservationRepository,
    models::user::Plan,
    services::{bot_rollup, feed_import, sweep},
    AppState,
};

fn authorized(headers: &HeaderMap, secret: &str) -> bool {
    let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    value.strip_prefix("Bearer ") == Some(secret) && !secret.is_empty()
}

pub async fn run_full_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorized(&headers, &state.cron_secret) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match sweep::full_sweep(&state.db, &state.http).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            tracing::error!("Full sweep failed: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn run_recheck_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorized(&headers, &state.cron_secret) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match sweep::recheck_down(&state.db, &state.http).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            tracing::error!("Recheck sweep failed: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn run_feed_import(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorized(&headers, &state.cron_secret) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match feed_import::import_feeds(&state.db, &state.http).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            tracing::error!("Feed import failed: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn run_bot_rollup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorized(&headers, &state.cron_secret) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let report = match bot_rollup::rollup_bot_visits(&state.db).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Bot visit rollup failed: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let alerted = match bot_rollup::alert_stale_ai_traffic(&state.db, &state.http).await {
        Ok(alerted) => alerted,
        Err(e) => {
            tracing::error!("Stale AI traffic alerting failed: {:?}", e);
            0
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "raw_compacted": report.raw_compacted,
            "hourly_pruned": report.hourly_pruned,
            "stale_alerts": alerted,
        })),
    )
        .into_response()
}

pub async fn run_retention(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorized(&headers, &state.cron_secret) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let repo = ObservationRepository::new(&state.db);
    let now = OffsetDateTime::now_utc();
    let mut pruned: u64 = 0;

    for plan in ["free", "pro", "enterprise"] {
        let cutoff = now - time::Duration::days(Plan::parse(plan).retention_days());
        match repo.prune_for_plan(plan, cutoff).await {
            Ok(count) => pruned += count,
            Err(e) => {
                tracing::error!("Observation pruning failed for plan {}: {:?}", plan, e);
            }
        }
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({ "observations_pruned": pruned })),
    )
        .into_response()
}
