use crate::models::user::Plan;
use sqlx::{MySqlPool, Row};

pub struct UserRepository<'a> {
    pub pool: &'a MySqlPool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Plan tier for quota and retention decisions; unknown users fall back
    /// to the free tier.
    pub async fn plan_of(&self, user_id: u64) -> Result<Plan, sqlx::Error> {
        let row = sqlx::query("SELECT plan FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => {
                let plan: String = row.try_get("plan")?;
                Ok(Plan::parse(&plan))
            }
            None => Ok(Plan::Free),
        }
    }
}
