use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::models::status::Status;
use crate::utils::datetime::serialize_offset_datetime;

/// A monitored target. `last_heartbeat_at` being set means the service
/// reports via push heartbeats instead of being probed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: u64,
    /// Owner; `None` for pending badge submissions nobody has claimed yet.
    pub user_id: Option<u64>,
    pub name: String,
    pub slug: String,
    pub domain: String,
    pub health_url: Option<String>,
    pub status: Status,
    pub latency_ms: Option<i32>,
    #[serde(serialize_with = "serialize_offset_datetime")]
    pub last_checked_at: Option<OffsetDateTime>,
    #[serde(serialize_with = "serialize_offset_datetime")]
    pub last_heartbeat_at: Option<OffsetDateTime>,
    pub feed_url: Option<String>,
    pub feed_provider: Option<String>,
    pub pending: bool,
    pub is_active: bool,
}

impl Service {
    pub fn is_push_mode(&self) -> bool {
        self.last_heartbeat_at.is_some()
    }
}

/// Derive a display name and slug from a reporting domain, used when a
/// heartbeat or badge view arrives for a domain we have not seen before.
pub fn derive_identity(domain: &str) -> (String, String) {
    let trimmed = domain.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let name = host.strip_prefix("www.").unwrap_or(host).to_string();
    let slug = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>();
    (name, slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_from_domain() {
        let (name, slug) = derive_identity("https://www.Example.com/");
        assert_eq!(name, "Example.com");
        assert_eq!(slug, "example-com");

        let (name, slug) = derive_identity("api.acme.io");
        assert_eq!(name, "api.acme.io");
        assert_eq!(slug, "api-acme-io");
    }
}
