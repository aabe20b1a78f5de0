//! Batched concurrent probing under a wall-clock time budget.
//!
//! A sweep is a one-shot bounded job: it partitions the target set into
//! fixed-size batches, probes each batch concurrently, and stops scheduling
//! further batches once the budget is spent. An in-flight batch always runs
//! to completion.

use std::future::Future;
use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::Client;
use sqlx::MySqlPool;
use time::OffsetDateTime;

use crate::db::{
    observation_repository::ObservationRepository, service_repository::ServiceRepository,
};
use crate::models::{service::Service, status::Status};
use crate::services::probe::{probe, ProbeOutcome};
use crate::services::transition::Transition;

/// A push-mode service is considered dead after this long without a heartbeat.
pub const HEARTBEAT_STALE_AFTER_MINS: i64 = 10;

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub budget: Duration,
    pub batch_size: usize,
    pub probe_timeout: Duration,
}

impl SweepOptions {
    /// Full sweep over every active pull-mode service.
    pub fn full() -> Self {
        Self {
            budget: Duration::from_secs(45),
            batch_size: 50,
            probe_timeout: Duration::from_secs(10),
        }
    }

    /// Faster, smaller-budget recheck of currently-down services, to shorten
    /// mean time to detect recovery.
    pub fn recheck() -> Self {
        Self {
            budget: Duration::from_secs(15),
            batch_size: 20,
            probe_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
pub struct SweepRun {
    pub results: Vec<(Service, ProbeOutcome)>,
    pub batches: usize,
    pub budget_exhausted: bool,
}

/// Probe `targets` in batches within the budget. Generic over the probe
/// function so batching semantics are testable without a network; a probe
/// future resolving to `None` counts as a failed probe and is omitted from
/// the results without affecting its siblings.
pub async fn run_sweep<F, Fut>(targets: Vec<Service>, options: &SweepOptions, probe_fn: F) -> SweepRun
where
    F: Fn(Service) -> Fut,
    Fut: Future<Output = Option<(Service, ProbeOutcome)>>,
{
    let started = Instant::now();
    let mut run = SweepRun::default();

    for batch in targets.chunks(options.batch_size.max(1)) {
        // Budget guard applies to every mode, recheck included.
        if started.elapsed() >= options.budget {
            run.budget_exhausted = true;
            break;
        }

        run.batches += 1;
        let settled = join_all(batch.iter().cloned().map(&probe_fn)).await;
        run.results.extend(settled.into_iter().flatten());
    }

    run
}

/// Sweep all active pull-mode services and persist the outcomes.
pub async fn full_sweep(pool: &MySqlPool, client: &Client) -> Result<SweepSummary, sqlx::Error> {
    let targets = ServiceRepository::new(pool).get_active_pull().await?;
    sweep_and_persist(pool, client, targets, &SweepOptions::full()).await
}

/// Re-probe only the services currently marked down.
pub async fn recheck_down(pool: &MySqlPool, client: &Client) -> Result<SweepSummary, sqlx::Error> {
    let targets = ServiceRepository::new(pool).get_down().await?;
    sweep_and_persist(pool, client, targets, &SweepOptions::recheck()).await
}

#[derive(Debug, serde::Serialize)]
pub struct SweepSummary {
    pub targets: usize,
    pub probed: usize,
    pub recorded: usize,
    pub batches: usize,
    pub budget_exhausted: bool,
    pub transitions: usize,
}

async fn sweep_and_persist(
    pool: &MySqlPool,
    client: &Client,
    targets: Vec<Service>,
    options: &SweepOptions,
) -> Result<SweepSummary, sqlx::Error> {
    let total = targets.len();
    tracing::info!("Starting sweep over {} services", total);

    let timeout = options.probe_timeout;
    let run = run_sweep(targets, options, |service| {
        let client = client.clone();
        async move {
            let outcome = probe(
                &client,
                &service.domain,
                service.health_url.as_deref(),
                timeout,
            )
            .await;
            Some((service, outcome))
        }
    })
    .await;

    let probed = run.results.len();
    let mut transitions = persist_results(pool, &run.results).await;
    transitions.extend(mark_stale_heartbeats(pool).await?);

    let summary = SweepSummary {
        targets: total,
        probed,
        recorded: probed,
        batches: run.batches,
        budget_exhausted: run.budget_exhausted,
        transitions: transitions.len(),
    };

    if !transitions.is_empty() {
        crate::services::notifier::notify_transitions(pool, client, &transitions).await;
    }

    tracing::info!(
        "Sweep finished: {}/{} probed in {} batches, {} transitions{}",
        probed,
        total,
        summary.batches,
        summary.transitions,
        if summary.budget_exhausted { " (budget exhausted)" } else { "" }
    );

    Ok(summary)
}

/// Persist each outcome (observation + cached status, atomically per
/// service) and collect the transitions to notify. A failed write drops
/// that service from this run without aborting the rest.
pub async fn persist_results(
    pool: &MySqlPool,
    results: &[(Service, ProbeOutcome)],
) -> Vec<Transition> {
    let obs_repo = ObservationRepository::new(pool);
    let mut transitions = Vec::new();

    for (service, outcome) in results {
        let recorded = obs_repo
            .record(
                service.id,
                outcome.status,
                Some(outcome.latency_ms),
                Some(outcome.status_code),
                false,
            )
            .await;

        if let Err(e) = recorded {
            tracing::error!("Failed to record observation for {}: {:?}", service.domain, e);
            continue;
        }

        // The first observation of a fresh service is not a transition.
        if service.status != outcome.status && service.status != Status::Unknown {
            transitions.push(Transition {
                service: service.clone(),
                previous: service.status,
                new: outcome.status,
            });
        }
    }

    transitions
}

/// Mark push-mode services dead when their heartbeat has gone silent.
pub async fn mark_stale_heartbeats(pool: &MySqlPool) -> Result<Vec<Transition>, sqlx::Error> {
    let cutoff = OffsetDateTime::now_utc() - time::Duration::minutes(HEARTBEAT_STALE_AFTER_MINS);
    let stale = ServiceRepository::new(pool).get_stale_push(cutoff).await?;

    let obs_repo = ObservationRepository::new(pool);
    let mut transitions = Vec::new();

    for service in stale {
        if let Err(e) = obs_repo.record(service.id, Status::Dead, None, None, false).await {
            tracing::error!("Failed to mark {} dead: {:?}", service.domain, e);
            continue;
        }

        tracing::warn!("No heartbeat from {} since cutoff, marking dead", service.domain);

        if service.status != Status::Unknown {
            transitions.push(Transition {
                previous: service.status,
                new: Status::Dead,
                service,
            });
        }
    }

    Ok(transitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn target(id: u64, domain: &str) -> Service {
        Service {
            id,
            user_id: Some(1),
            name: domain.to_string(),
            slug: domain.replace('.', "-"),
            domain: domain.to_string(),
            health_url: None,
            status: Status::Up,
            latency_ms: None,
            last_checked_at: None,
            last_heartbeat_at: None,
            feed_url: None,
            feed_provider: None,
            pending: false,
            is_active: true,
        }
    }

    fn up_outcome() -> ProbeOutcome {
        ProbeOutcome {
            status: Status::Up,
            latency_ms: 20,
            status_code: 200,
            checked_at: OffsetDateTime::now_utc(),
            used_health_endpoint: false,
            health_payload: None,
        }
    }

    #[tokio::test]
    async fn schedules_ceil_of_targets_over_batch_size_batches() {
        let targets: Vec<Service> = (0..11).map(|i| target(i, "svc.example.com")).collect();
        let options = SweepOptions {
            budget: Duration::from_secs(5),
            batch_size: 4,
            probe_timeout: Duration::from_millis(10),
        };

        let run = run_sweep(targets, &options, |service| async move {
            Some((service, up_outcome()))
        })
        .await;

        assert_eq!(run.batches, 3); // ceil(11 / 4)
        assert_eq!(run.results.len(), 11);
        assert!(!run.budget_exhausted);
    }

    #[tokio::test]
    async fn stops_scheduling_once_budget_is_spent() {
        let targets: Vec<Service> = (0..10).map(|i| target(i, "svc.example.com")).collect();
        let options = SweepOptions {
            budget: Duration::from_millis(30),
            batch_size: 2,
            probe_timeout: Duration::from_millis(10),
        };

        let run = run_sweep(targets, &options, |service| async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Some((service, up_outcome()))
        })
        .await;

        // The first batch exceeds the budget by itself, so only it runs,
        // and it still completes.
        assert_eq!(run.batches, 1);
        assert_eq!(run.results.len(), 2);
        assert!(run.budget_exhausted);
    }

    #[tokio::test]
    async fn failed_probes_are_omitted_without_affecting_siblings() {
        let targets: Vec<Service> = (0..6).map(|i| target(i, "svc.example.com")).collect();
        let options = SweepOptions {
            budget: Duration::from_secs(5),
            batch_size: 3,
            probe_timeout: Duration::from_millis(10),
        };

        let run = run_sweep(targets, &options, |service| async move {
            if service.id % 2 == 0 {
                None // simulated probe-task failure
            } else {
                Some((service, up_outcome()))
            }
        })
        .await;

        assert_eq!(run.batches, 2);
        assert_eq!(run.results.len(), 3);
        assert!(run.results.iter().all(|(s, _)| s.id % 2 == 1));
    }

    #[tokio::test]
    async fn batch_in_flight_is_never_abandoned() {
        let completed = Arc::new(AtomicUsize::new(0));
        let targets: Vec<Service> = (0..4).map(|i| target(i, "svc.example.com")).collect();
        let options = SweepOptions {
            budget: Duration::from_millis(5),
            batch_size: 4,
            probe_timeout: Duration::from_millis(10),
        };

        let counter = completed.clone();
        let run = run_sweep(targets, &options, move |service| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Some((service, up_outcome()))
            }
        })
        .await;

        // Budget was tiny, but the already-started batch finished in full.
        assert_eq!(completed.load(Ordering::SeqCst), 4);
        assert_eq!(run.results.len(), 4);
    }
}
