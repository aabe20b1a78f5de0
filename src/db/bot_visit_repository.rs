use sqlx::{MySqlPool, QueryBuilder, Row};
use time::OffsetDateTime;

use crate::models::bot_visit::BotVisitHourly;

/// Raw visit row ready for ingestion, already validated against the bot registry.
#[derive(Debug, Clone)]
pub struct NewBotVisit {
    pub user_id: u64,
    pub domain: String,
    pub bot_name: String,
    pub bot_category: String,
    pub path: String,
    pub visited_at: OffsetDateTime,
}

/// Optional predicates for the hourly query surface. Every present filter
/// becomes one composed clause; absent ones are simply skipped.
#[derive(Debug, Default)]
pub struct HourlyFilter {
    pub user_id: u64,
    pub domain: String,
    pub bot_name: Option<String>,
    pub bot_category: Option<String>,
    pub path: Option<String>,
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct TrafficTotals {
    pub distinct_bots: Vec<String>,
    pub total_visits: i64,
    pub distinct_pages: i64,
}

pub struct BotVisitRepository<'a> {
    pub pool: &'a MySqlPool,
}

impl<'a> BotVisitRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn insert_batch(&self, visits: &[NewBotVisit]) -> Result<u64, sqlx::Error> {
        if visits.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::new(
            "INSERT INTO bot_visits (user_id, domain, bot_name, bot_category, path, visited_at) ",
        );
        qb.push_values(visits, |mut b, v| {
            b.push_bind(v.user_id)
                .push_bind(&v.domain)
                .push_bind(&v.bot_name)
                .push_bind(&v.bot_category)
                .push_bind(&v.path)
                .push_bind(v.visited_at);
        });

        let result = qb.build().execute(self.pool).await?;

        Ok(result.rows_affected())
    }

    /// Append-then-compact rollup: sum raw visits into hourly buckets
    /// (additive on conflict), then delete exactly the raw rows that were
    /// aggregated. Everything runs in one transaction against a fixed id
    /// boundary so rows ingested mid-rollup survive to the next run.
    pub async fn rollup(&self) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT MAX(id) as max_id FROM bot_visits")
            .fetch_one(&mut *tx)
            .await?;
        let boundary: Option<u64> = row.try_get("max_id")?;

        let Some(boundary) = boundary else {
            tx.commit().await?;
            return Ok(0);
        };

        sqlx::query(
            r#"
            INSERT INTO bot_visits_hourly
                (user_id, domain, bot_name, bot_category, path, hour_bucket, visit_count)
            SELECT user_id, domain, bot_name, bot_category, path,
                   DATE_FORMAT(visited_at, '%Y-%m-%d %H:00:00'),
                   COUNT(*)
            FROM bot_visits
            WHERE id <= ?
            GROUP BY user_id, domain, bot_name, bot_category, path,
                     DATE_FORMAT(visited_at, '%Y-%m-%d %H:00:00')
            ON DUPLICATE KEY UPDATE visit_count = visit_count + VALUES(visit_count)
            "#,
        )
        .bind(boundary)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM bot_visits WHERE id <= ?")
            .bind(boundary)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(deleted)
    }

    pub async fn prune_hourly(&self, cutoff: OffsetDateTime) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bot_visits_hourly WHERE hour_bucket < ?")
            .bind(cutoff)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Hourly rows matching the composed filter set.
    pub async fn query_hourly(&self, filter: &HourlyFilter) -> Result<Vec<BotVisitHourly>, sqlx::Error> {
        let mut qb = QueryBuilder::new(
            "SELECT id, user_id, domain, bot_name, bot_category, path, hour_bucket, visit_count \
             FROM bot_visits_hourly WHERE user_id = ",
        );
        qb.push_bind(filter.user_id);
        qb.push(" AND domain = ").push_bind(&filter.domain);

        if let Some(bot_name) = &filter.bot_name {
            qb.push(" AND bot_name = ").push_bind(bot_name);
        }
        if let Some(category) = &filter.bot_category {
            qb.push(" AND bot_category = ").push_bind(category);
        }
        if let Some(path) = &filter.path {
            qb.push(" AND path = ").push_bind(path);
        }
        if let Some(from) = filter.from {
            qb.push(" AND hour_bucket >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND hour_bucket < ").push_bind(to);
        }
        qb.push(" ORDER BY hour_bucket DESC");

        qb.build_query_as::<BotVisitHourly>().fetch_all(self.pool).await
    }

    /// Aggregates for the visibility score over one lookback window.
    pub async fn traffic_totals(
        &self,
        user_id: u64,
        domain: &str,
        category: &str,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<TrafficTotals, sqlx::Error> {
        let bot_rows = sqlx::query(
            r#"
            SELECT DISTINCT bot_name
            FROM bot_visits_hourly
            WHERE user_id = ? AND domain = ? AND bot_category = ?
              AND hour_bucket >= ? AND hour_bucket < ?
            "#,
        )
        .bind(user_id)
        .bind(domain)
        .bind(category)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        let distinct_bots = bot_rows
            .into_iter()
            .map(|row| row.try_get("bot_name"))
            .collect::<Result<Vec<String>, _>>()?;

        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(visit_count), 0) as total, COUNT(DISTINCT path) as pages
            FROM bot_visits_hourly
            WHERE user_id = ? AND domain = ? AND bot_category = ?
              AND hour_bucket >= ? AND hour_bucket < ?
            "#,
        )
        .bind(user_id)
        .bind(domain)
        .bind(category)
        .bind(from)
        .bind(to)
        .fetch_one(self.pool)
        .await?;

        Ok(TrafficTotals {
            distinct_bots,
            total_visits: row.try_get::<i64, _>("total").unwrap_or(0),
            distinct_pages: row.try_get("pages")?,
        })
    }

    pub async fn total_visits(
        &self,
        user_id: u64,
        domain: &str,
        category: &str,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(visit_count), 0) as total
            FROM bot_visits_hourly
            WHERE user_id = ? AND domain = ? AND bot_category = ?
              AND hour_bucket >= ? AND hour_bucket < ?
            "#,
        )
        .bind(user_id)
        .bind(domain)
        .bind(category)
        .bind(from)
        .bind(to)
        .fetch_one(self.pool)
        .await?;

        Ok(row.try_get::<i64, _>("total").unwrap_or(0))
    }

    /// Whether this `(user, domain)` has ever recorded hourly AI traffic,
    /// for the trend sub-score's first-data rule.
    pub async fn has_any_traffic(
        &self,
        user_id: u64,
        domain: &str,
        category: &str,
        before: OffsetDateTime,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM bot_visits_hourly
            WHERE user_id = ? AND domain = ? AND bot_category = ? AND hour_bucket < ?
            "#,
        )
        .bind(user_id)
        .bind(domain)
        .bind(category)
        .bind(before)
        .fetch_one(self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;

        Ok(count > 0)
    }

    /// `(user, domain)` pairs whose newest AI-crawler bucket is older than
    /// `cutoff` — candidates for the stale-traffic cooldown alert.
    pub async fn stale_ai_domains(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<(u64, String)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, domain
            FROM bot_visits_hourly
            WHERE bot_category = 'ai_crawler'
            GROUP BY user_id, domain
            HAVING MAX(hour_bucket) < ?
            "#,
        )
        .bind(cutoff)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok((row.try_get("user_id")?, row.try_get("domain")?)))
            .collect()
    }
}
