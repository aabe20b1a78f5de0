use sqlx::MySqlPool;

use crate::models::webhook::Webhook;

pub struct WebhookRepository<'a> {
    pub pool: &'a MySqlPool,
}

impl<'a> WebhookRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Active webhooks of every user watching the given service. Event-set
    /// filtering happens in the caller via `Webhook::wants`.
    pub async fn subscribed_to(&self, service_id: u64) -> Result<Vec<Webhook>, sqlx::Error> {
        sqlx::query_as::<_, Webhook>(
            r#"
            SELECT w.id, w.user_id, w.url, w.kind, w.events, w.active
            FROM webhooks w
            JOIN watch_entries we ON we.user_id = w.user_id
            WHERE we.service_id = ? AND w.active = 1
            "#,
        )
        .bind(service_id)
        .fetch_all(self.pool)
        .await
    }

    pub async fn for_user(&self, user_id: u64) -> Result<Vec<Webhook>, sqlx::Error> {
        sqlx::query_as::<_, Webhook>(
            r#"
            SELECT id, user_id, url, kind, events, active
            FROM webhooks
            WHERE user_id = ? AND active = 1
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
    }
}
