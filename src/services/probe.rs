//! Pull-based status determination for a single target.
//!
//! Tries the structured health-check contract first and falls back to a bare
//! connectivity probe. Both attempts share one deadline, so a probe never
//! takes more than the configured timeout overall.

use std::time::{Duration, Instant};

use reqwest::Client;
use time::OffsetDateTime;

use crate::models::{health::HealthCheckPayload, status::Status};

/// Latency above this is classified `slow`, for probes and heartbeats alike.
pub const SLOW_THRESHOLD_MS: i64 = 3000;

/// Result of one status determination. Never an error: unreachable targets
/// come back as `down` with status code 0.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status: Status,
    pub latency_ms: i32,
    pub status_code: i32,
    pub checked_at: OffsetDateTime,
    pub used_health_endpoint: bool,
    pub health_payload: Option<HealthCheckPayload>,
}

enum HealthAttempt {
    Hit(ProbeOutcome),
    Miss,
}

/// Probe one domain within `timeout`.
///
/// `health_url` overrides the default `https://{domain}/api/health` when the
/// target registered a custom health endpoint.
pub async fn probe(
    client: &Client,
    domain: &str,
    health_url: Option<&str>,
    timeout: Duration,
) -> ProbeOutcome {
    let deadline = Instant::now() + timeout;

    let url = match health_url {
        Some(custom) => custom.to_string(),
        None => format!("https://{}/api/health", domain),
    };

    match health_attempt(client, &url, timeout).await {
        HealthAttempt::Hit(outcome) => outcome,
        HealthAttempt::Miss => {
            // Fall back on whatever budget the health attempt left us.
            let remaining = deadline.saturating_duration_since(Instant::now());
            fallback_probe(client, domain, remaining).await
        }
    }
}

/// GET the health endpoint. A 404/405, an unparseable body, a body without a
/// `status` field, or any transport failure is a miss, not an error.
async fn health_attempt(client: &Client, url: &str, timeout: Duration) -> HealthAttempt {
    let start = Instant::now();

    let response = match client.get(url).timeout(timeout).send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::debug!("Health endpoint attempt failed for {}: {}", url, e);
            return HealthAttempt::Miss;
        }
    };

    let status_code = response.status().as_u16();
    if status_code == 404 || status_code == 405 {
        return HealthAttempt::Miss;
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(_) => return HealthAttempt::Miss,
    };

    let latency_ms = start.elapsed().as_millis() as i64;

    // A required `status` field makes "JSON but not a health payload" a miss too.
    let payload: HealthCheckPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(_) => return HealthAttempt::Miss,
    };

    let status = classify_health(status_code, &payload, latency_ms);

    HealthAttempt::Hit(ProbeOutcome {
        status,
        latency_ms: latency_ms as i32,
        status_code: i32::from(status_code),
        checked_at: OffsetDateTime::now_utc(),
        used_health_endpoint: true,
        health_payload: Some(payload),
    })
}

/// Bare HEAD against the domain root. DNS, TLS, and connect failures all
/// collapse to `down` with status code 0.
async fn fallback_probe(client: &Client, domain: &str, budget: Duration) -> ProbeOutcome {
    let url = format!("https://{}", domain);
    let start = Instant::now();

    match client.head(&url).timeout(budget).send().await {
        Ok(resp) => {
            let status_code = resp.status().as_u16();
            let latency_ms = start.elapsed().as_millis() as i64;
            ProbeOutcome {
                status: classify_fallback(status_code, latency_ms),
                latency_ms: latency_ms as i32,
                status_code: i32::from(status_code),
                checked_at: OffsetDateTime::now_utc(),
                used_health_endpoint: false,
                health_payload: None,
            }
        }
        Err(e) => {
            tracing::debug!("Fallback probe failed for {}: {}", domain, e);
            ProbeOutcome {
                status: Status::Down,
                latency_ms: start.elapsed().as_millis() as i32,
                status_code: 0,
                checked_at: OffsetDateTime::now_utc(),
                used_health_endpoint: false,
                health_payload: None,
            }
        }
    }
}

/// Classify a parsed health payload together with its HTTP status and latency.
pub fn classify_health(http_status: u16, payload: &HealthCheckPayload, latency_ms: i64) -> Status {
    if http_status >= 500 || payload.has_error() {
        Status::Down
    } else if payload.status == "degraded" || latency_ms > SLOW_THRESHOLD_MS {
        Status::Slow
    } else {
        Status::Up
    }
}

/// Classify a bare connectivity probe that got an HTTP response.
pub fn classify_fallback(http_status: u16, latency_ms: i64) -> Status {
    if http_status >= 500 {
        Status::Down
    } else if latency_ms > SLOW_THRESHOLD_MS {
        Status::Slow
    } else {
        Status::Up
    }
}
