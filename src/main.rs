mod db;
mod handlers;
mod models;
mod routes;
mod services;
mod utils;

use std::{env, net::SocketAddr};

use axum::{routing::get, Router};
use dotenvy::dotenv;
use sqlx::mysql::MySqlPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::MySqlPool,
    pub http: reqwest::Client,
    pub cron_secret: String,
}

#[tokio::main]
async fn main() -> Result<(), sqlx::Error> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .compact()
        .init();

    tracing::info!("Environment variables loaded.");

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("DB is ready.");

    let cron_secret = env::var("CRON_SECRET").expect("CRON_SECRET must be set");

    let state = AppState {
        db: pool,
        http: reqwest::Client::new(),
        cron_secret,
    };

    let app = Router::new()
        .nest(
            "/api",
            routes::api_routes()
                .nest("/cron", routes::cron_routes())
                .with_state(state.clone()),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()
        .expect("BIND_ADDR must be a valid socket address");
    tracing::info!("pulsewatch is listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .expect("server error");

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
