use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum WebhookKind {
    Discord,
    Slack,
    Custom,
}

/// A user-configured webhook endpoint. `events` is a comma-joined set of
/// event names the owner wants delivered.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Webhook {
    pub id: u64,
    pub user_id: u64,
    pub url: String,
    pub kind: WebhookKind,
    pub events: String,
    pub active: bool,
}

impl Webhook {
    pub fn wants(&self, event: &str) -> bool {
        self.events.split(',').any(|e| e.trim() == event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_set_membership() {
        let hook = Webhook {
            id: 1,
            user_id: 1,
            url: "https://hooks.example.com/x".into(),
            kind: WebhookKind::Custom,
            events: "down, recovered,dead".into(),
            active: true,
        };
        assert!(hook.wants("down"));
        assert!(hook.wants("recovered"));
        assert!(hook.wants("dead"));
        assert!(!hook.wants("slow"));
    }
}
