use sqlx::MySqlPool;

use crate::models::incident::{Incident, NewIncident};

pub struct IncidentRepository<'a> {
    pub pool: &'a MySqlPool,
}

impl<'a> IncidentRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Idempotent import keyed on `(service_id, source_id)`: a re-imported
    /// incident updates its mutable fields instead of creating a second row.
    pub async fn upsert(&self, service_id: u64, incident: &NewIncident) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO incidents
                (service_id, source_id, title, description, severity, status, started_at, resolved_at, source_url)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                title = VALUES(title),
                description = VALUES(description),
                severity = VALUES(severity),
                status = VALUES(status),
                resolved_at = VALUES(resolved_at)
            "#,
        )
        .bind(service_id)
        .bind(&incident.source_id)
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.severity)
        .bind(incident.status)
        .bind(incident.started_at)
        .bind(incident.resolved_at)
        .bind(&incident.source_url)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_for_service(&self, service_id: u64, limit: u32) -> Result<Vec<Incident>, sqlx::Error> {
        sqlx::query_as::<_, Incident>(
            r#"
            SELECT id, service_id, source_id, title, description, severity, status,
                   started_at, resolved_at, source_url
            FROM incidents
            WHERE service_id = ?
            ORDER BY started_at DESC
            LIMIT ?
            "#,
        )
        .bind(service_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await
    }
}
