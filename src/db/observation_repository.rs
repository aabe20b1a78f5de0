use sqlx::MySqlPool;
use time::OffsetDateTime;

use crate::models::{observation::StatusObservation, status::Status};

pub struct ObservationRepository<'a> {
    pub pool: &'a MySqlPool,
}

impl<'a> ObservationRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Append one observation and overwrite the service's cached status in a
    /// single transaction, so the cache and the history row always agree.
    /// `heartbeat` additionally stamps `last_heartbeat_at`.
    pub async fn record(
        &self,
        service_id: u64,
        status: Status,
        latency_ms: Option<i32>,
        status_code: Option<i32>,
        heartbeat: bool,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO status_observations (service_id, status, latency_ms, status_code, observed_at)
            VALUES (?, ?, ?, ?, NOW())
            "#,
        )
        .bind(service_id)
        .bind(status)
        .bind(latency_ms)
        .bind(status_code)
        .execute(&mut *tx)
        .await?;

        if heartbeat {
            sqlx::query(
                r#"
                UPDATE services
                SET status = ?, latency_ms = ?, last_checked_at = NOW(), last_heartbeat_at = NOW()
                WHERE id = ?
                "#,
            )
            .bind(status)
            .bind(latency_ms)
            .bind(service_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE services
                SET status = ?, latency_ms = ?, last_checked_at = NOW()
                WHERE id = ?
                "#,
            )
            .bind(status)
            .bind(latency_ms)
            .bind(service_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    pub async fn get_recent(
        &self,
        service_id: u64,
        limit: u32,
    ) -> Result<Vec<StatusObservation>, sqlx::Error> {
        tracing::info!("Fetching last {} observations for service_id {}", limit, service_id);

        sqlx::query_as::<_, StatusObservation>(
            r#"
            SELECT id, service_id, status, latency_ms, status_code, observed_at
            FROM status_observations
            WHERE service_id = ?
            ORDER BY observed_at DESC
            LIMIT ?
            "#,
        )
        .bind(service_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await
    }

    /// Retention: drop history older than `cutoff` for services owned by
    /// users on the given plan.
    pub async fn prune_for_plan(&self, plan: &str, cutoff: OffsetDateTime) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE o FROM status_observations o
            JOIN services s ON s.id = o.service_id
            JOIN users u ON u.id = s.user_id
            WHERE u.plan = ? AND o.observed_at < ?
            "#,
        )
        .bind(plan)
        .bind(cutoff)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
