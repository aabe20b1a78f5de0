//! Push-based status interpretation and recording.

use reqwest::Client;
use sqlx::MySqlPool;

use crate::db::{
    observation_repository::ObservationRepository, service_repository::ServiceRepository,
    user_repository::UserRepository, watch_list_repository::WatchListRepository,
};
use crate::models::{
    health::HealthCheckPayload,
    service::{derive_identity, Service},
    status::Status,
};
use crate::services::{
    notifier,
    probe::SLOW_THRESHOLD_MS,
    transition::Transition,
};

/// Derive a verdict from a self-reported health payload. Pure: same payload
/// and same max check latency always give the same status.
pub fn interpret(payload: &HealthCheckPayload, max_check_latency_ms: Option<i64>) -> Status {
    if payload.has_error() {
        Status::Down
    } else if payload.status == "degraded"
        || max_check_latency_ms.map_or(false, |latency| latency > SLOW_THRESHOLD_MS)
    {
        Status::Slow
    } else {
        Status::Up
    }
}

/// Record one pushed heartbeat: resolve (or auto-register) the service,
/// persist the observation together with the cached status, and notify on a
/// transition. Auto-registration also puts the service on the reporting
/// user's watch-list, within the plan-tier quota.
pub async fn record_heartbeat(
    pool: &MySqlPool,
    client: &Client,
    user_id: u64,
    domain: &str,
    payload: &HealthCheckPayload,
) -> Result<Status, sqlx::Error> {
    let max_latency = payload.max_check_latency();
    let status = interpret(payload, max_latency);
    let latency_ms = max_latency.map(|l| l as i32);

    let service = resolve_service(pool, user_id, domain).await?;
    let previous = service.status;

    ObservationRepository::new(pool)
        .record(service.id, status, latency_ms, None, true)
        .await?;

    tracing::info!(
        "Heartbeat for {} -> {} (previous {})",
        service.domain, status, previous
    );

    if previous != status && previous != Status::Unknown {
        let transitions = [Transition {
            service,
            previous,
            new: status,
        }];
        notifier::notify_transitions(pool, client, &transitions).await;
    }

    Ok(status)
}

async fn resolve_service(
    pool: &MySqlPool,
    user_id: u64,
    domain: &str,
) -> Result<Service, sqlx::Error> {
    let service_repo = ServiceRepository::new(pool);

    if let Some(service) = service_repo.find_by_domain(user_id, domain).await? {
        return Ok(service);
    }

    // First contact from this domain: register it as a push-mode service.
    let (name, slug) = derive_identity(domain);
    let service_id = service_repo
        .register_push(user_id, &name, &slug, domain)
        .await?;

    let plan = UserRepository::new(pool).plan_of(user_id).await?;
    let watch_repo = WatchListRepository::new(pool);
    let within_quota = match plan.watch_quota() {
        None => true,
        Some(quota) => watch_repo.count_for_user(user_id).await? < i64::from(quota),
    };

    if within_quota {
        watch_repo.add(user_id, service_id).await?;
    } else {
        tracing::warn!(
            "Watch-list quota reached for user_id {}; {} registered but not watched",
            user_id, domain
        );
    }

    service_repo
        .find_by_domain(user_id, domain)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::models::health::HealthCheck;

    fn payload(status: &str, checks: &[(&str, &str)]) -> HealthCheckPayload {
        let map: HashMap<String, HealthCheck> = checks
            .iter()
            .map(|(name, status)| {
                (
                    name.to_string(),
                    HealthCheck {
                        status: status.to_string(),
                        latency: None,
                        message: None,
                    },
                )
            })
            .collect();
        HealthCheckPayload {
            status: status.to_string(),
            checks: if map.is_empty() { None } else { Some(map) },
        }
    }

    #[test]
    fn error_payload_is_down() {
        assert_eq!(interpret(&payload("error", &[]), None), Status::Down);
    }

    #[test]
    fn failing_check_is_down_even_when_top_level_ok() {
        assert_eq!(
            interpret(&payload("ok", &[("queue", "error")]), Some(20)),
            Status::Down
        );
    }

    #[test]
    fn degraded_is_slow() {
        assert_eq!(interpret(&payload("degraded", &[]), None), Status::Slow);
    }

    #[test]
    fn slow_check_latency_is_slow() {
        assert_eq!(interpret(&payload("ok", &[]), Some(4500)), Status::Slow);
    }

    #[test]
    fn healthy_payload_is_up() {
        assert_eq!(interpret(&payload("ok", &[("db", "ok")]), Some(120)), Status::Up);
    }

    #[test]
    fn interpretation_is_deterministic() {
        let p = payload("ok", &[("db", "ok")]);
        let first = interpret(&p, Some(100));
        for _ in 0..10 {
            assert_eq!(interpret(&p, Some(100)), first);
        }
    }
}
