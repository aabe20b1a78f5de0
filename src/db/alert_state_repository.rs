use sqlx::{MySqlPool, Row};
use time::OffsetDateTime;

pub struct AlertStateRepository<'a> {
    pub pool: &'a MySqlPool,
}

impl<'a> AlertStateRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Cooldown check for periodic alerts not tied to a status transition,
    /// e.g. "no AI crawler traffic in 48h".
    pub async fn recently_alerted(
        &self,
        user_id: u64,
        domain: &str,
        alert_type: &str,
        since: OffsetDateTime,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM alert_states
            WHERE user_id = ? AND domain = ? AND alert_type = ? AND last_alerted_at >= ?
            "#,
        )
        .bind(user_id)
        .bind(domain)
        .bind(alert_type)
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;

        Ok(count > 0)
    }

    pub async fn mark_alerted(
        &self,
        user_id: u64,
        domain: &str,
        alert_type: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO alert_states (user_id, domain, alert_type, last_alerted_at)
            VALUES (?, ?, ?, NOW())
            ON DUPLICATE KEY UPDATE last_alerted_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(domain)
        .bind(alert_type)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
