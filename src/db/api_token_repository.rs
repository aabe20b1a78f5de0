use sqlx::{MySqlPool, Row};

pub struct ApiTokenRepository<'a> {
    pub pool: &'a MySqlPool,
}

impl<'a> ApiTokenRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Resolve a bearer API token to its owning user.
    pub async fn resolve(&self, token: &str) -> Result<Option<u64>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT user_id FROM api_tokens WHERE token = ? AND revoked = 0",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("user_id")?)),
            None => Ok(None),
        }
    }
}
