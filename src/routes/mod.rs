use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    handlers::{
        badge_handler, bot_visit_handler, cron_handler, heartbeat_handler, observation_handler,
    },
    AppState,
};

/// Authenticated push and read API.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/heartbeat", post(heartbeat_handler::push_heartbeat))
        .route("/v1/bot-visits", post(bot_visit_handler::ingest_bot_visits))
        .route("/v1/bot-visits", get(bot_visit_handler::query_bot_visits))
        .route("/v1/visibility", get(bot_visit_handler::visibility_score))
        .route(
            "/v1/services/:id/observations",
            get(observation_handler::list_observations),
        )
        .route(
            "/v1/services/:id/incidents",
            get(observation_handler::list_incidents),
        )
        .route("/badge/:slug", get(badge_handler::status_badge))
}

/// One-shot scheduled jobs, gated by the cron secret.
pub fn cron_routes() -> Router<AppState> {
    Router::new()
        .route("/sweep", post(cron_handler::run_full_sweep))
        .route("/recheck", post(cron_handler::run_recheck_sweep))
        .route("/feeds", post(cron_handler::run_feed_import))
        .route("/bot-rollup", post(cron_handler::run_bot_rollup))
        .route("/retention", post(cron_handler::run_retention))
}
