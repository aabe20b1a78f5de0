use sqlx::MySqlPool;
use time::OffsetDateTime;

use crate::models::service::Service;

const SERVICE_COLUMNS: &str = "id, user_id, name, slug, domain, health_url, status, latency_ms, \
     last_checked_at, last_heartbeat_at, feed_url, feed_provider, pending, is_active";

pub struct ServiceRepository<'a> {
    pub pool: &'a MySqlPool,
}

impl<'a> ServiceRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Pull-mode services eligible for the full sweep.
    pub async fn get_active_pull(&self) -> Result<Vec<Service>, sqlx::Error> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE is_active = 1 AND pending = 0 AND last_heartbeat_at IS NULL"
        );
        sqlx::query_as::<_, Service>(&sql).fetch_all(self.pool).await
    }

    /// Pull-mode services currently marked down, for the recheck sweep.
    pub async fn get_down(&self) -> Result<Vec<Service>, sqlx::Error> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE is_active = 1 AND pending = 0 AND last_heartbeat_at IS NULL AND status = 'down'"
        );
        sqlx::query_as::<_, Service>(&sql).fetch_all(self.pool).await
    }

    /// Push-mode services whose last heartbeat is older than `cutoff` and
    /// that are not already marked dead.
    pub async fn get_stale_push(&self, cutoff: OffsetDateTime) -> Result<Vec<Service>, sqlx::Error> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE is_active = 1 AND last_heartbeat_at IS NOT NULL \
             AND last_heartbeat_at < ? AND status <> 'dead'"
        );
        sqlx::query_as::<_, Service>(&sql)
            .bind(cutoff)
            .fetch_all(self.pool)
            .await
    }

    /// Services with a configured incident feed.
    pub async fn with_feeds(&self) -> Result<Vec<Service>, sqlx::Error> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE is_active = 1 AND feed_url IS NOT NULL"
        );
        sqlx::query_as::<_, Service>(&sql).fetch_all(self.pool).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Service>, sqlx::Error> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE slug = ?");
        sqlx::query_as::<_, Service>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn find_by_domain(&self, user_id: u64, domain: &str) -> Result<Option<Service>, sqlx::Error> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE user_id = ? AND domain = ?");
        sqlx::query_as::<_, Service>(&sql)
            .bind(user_id)
            .bind(domain)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn find_owned(&self, service_id: u64, user_id: u64) -> Result<Option<Service>, sqlx::Error> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ? AND user_id = ?");
        sqlx::query_as::<_, Service>(&sql)
            .bind(service_id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await
    }

    /// Auto-register a push-mode service on first heartbeat contact.
    pub async fn register_push(
        &self,
        user_id: u64,
        name: &str,
        slug: &str,
        domain: &str,
    ) -> Result<u64, sqlx::Error> {
        tracing::info!(
            "Registering push service -> user_id: {}, domain: '{}', slug: '{}'",
            user_id, domain, slug
        );

        let result = sqlx::query(
            r#"
            INSERT INTO services (user_id, name, slug, domain, status, last_heartbeat_at, pending, is_active)
            VALUES (?, ?, ?, ?, 'unknown', NOW(), 0, 1)
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(slug)
        .bind(domain)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    /// Register an unknown badge slug as a pending submission.
    pub async fn register_pending(&self, slug: &str) -> Result<u64, sqlx::Error> {
        tracing::info!("Registering pending submission for badge slug '{}'", slug);

        let result = sqlx::query(
            r#"
            INSERT INTO services (user_id, name, slug, domain, status, pending, is_active)
            VALUES (NULL, ?, ?, ?, 'unknown', 1, 0)
            "#,
        )
        .bind(slug)
        .bind(slug)
        .bind(slug)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_id())
    }
}
