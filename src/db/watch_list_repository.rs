use sqlx::{MySqlPool, Row};

pub struct WatchListRepository<'a> {
    pub pool: &'a MySqlPool,
}

impl<'a> WatchListRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn count_for_user(&self, user_id: u64) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM watch_entries WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        row.try_get("count")
    }

    pub async fn add(&self, user_id: u64, service_id: u64) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT IGNORE INTO watch_entries (user_id, service_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(service_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
