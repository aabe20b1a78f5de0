//! Bot registry, hourly visit rollup, and the stale-traffic alert job.

use reqwest::Client;
use sqlx::MySqlPool;
use time::OffsetDateTime;

use crate::db::bot_visit_repository::BotVisitRepository;
use crate::services::notifier;

/// Ingestion batch cap per API call.
pub const MAX_VISITS_PER_CALL: usize = 100;

/// Hourly aggregates older than this are pruned.
pub const HOURLY_RETENTION_DAYS: i64 = 30;

pub const AI_CATEGORY: &str = "ai_crawler";

/// Recognized crawlers. Visits from bots not listed here are dropped at
/// ingestion, not errored.
const KNOWN_BOTS: &[(&str, &str)] = &[
    ("GPTBot", AI_CATEGORY),
    ("ClaudeBot", AI_CATEGORY),
    ("Claude-User", AI_CATEGORY),
    ("PerplexityBot", AI_CATEGORY),
    ("Google-Extended", AI_CATEGORY),
    ("CCBot", AI_CATEGORY),
    ("Bytespider", AI_CATEGORY),
    ("Amazonbot", AI_CATEGORY),
    ("cohere-ai", AI_CATEGORY),
    ("Applebot-Extended", AI_CATEGORY),
    ("Googlebot", "search_engine"),
    ("Bingbot", "search_engine"),
    ("DuckDuckBot", "search_engine"),
];

/// Category for a known bot name (case-insensitive), `None` for strangers.
pub fn bot_category(name: &str) -> Option<&'static str> {
    KNOWN_BOTS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, category)| *category)
}

pub fn ai_bots() -> impl Iterator<Item = &'static str> {
    KNOWN_BOTS
        .iter()
        .filter(|(_, category)| *category == AI_CATEGORY)
        .map(|(name, _)| *name)
}

pub fn ai_bot_count() -> usize {
    ai_bots().count()
}

#[derive(Debug, serde::Serialize)]
pub struct RollupReport {
    pub raw_compacted: u64,
    pub hourly_pruned: u64,
}

/// Roll raw visits up into hourly buckets and prune aged aggregates.
pub async fn rollup_bot_visits(pool: &MySqlPool) -> Result<RollupReport, sqlx::Error> {
    let repo = BotVisitRepository::new(pool);

    let raw_compacted = repo.rollup().await?;

    let cutoff = OffsetDateTime::now_utc() - time::Duration::days(HOURLY_RETENTION_DAYS);
    let hourly_pruned = repo.prune_hourly(cutoff).await?;

    tracing::info!(
        "Bot visit rollup: {} raw rows compacted, {} hourly rows pruned",
        raw_compacted, hourly_pruned
    );

    Ok(RollupReport {
        raw_compacted,
        hourly_pruned,
    })
}

/// Alert owners whose domains stopped seeing AI crawler traffic, at most
/// once per cooldown window per domain.
pub async fn alert_stale_ai_traffic(pool: &MySqlPool, client: &Client) -> Result<usize, sqlx::Error> {
    let cutoff = OffsetDateTime::now_utc() - time::Duration::hours(notifier::ALERT_COOLDOWN_HOURS);
    let stale = BotVisitRepository::new(pool).stale_ai_domains(cutoff).await?;

    let mut alerted = 0;
    for (user_id, domain) in stale {
        let message = format!("No AI crawler visits on {} in the last 48 hours", domain);
        if notifier::alert_once(pool, client, user_id, &domain, "no-ai-traffic", &message).await {
            alerted += 1;
        }
    }

    Ok(alerted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_is_case_insensitive() {
        assert_eq!(bot_category("GPTBot"), Some(AI_CATEGORY));
        assert_eq!(bot_category("gptbot"), Some(AI_CATEGORY));
        assert_eq!(bot_category("googlebot"), Some("search_engine"));
        assert_eq!(bot_category("TotallyUnknownBot"), None);
    }

    #[test]
    fn ai_bot_set_is_nonempty_and_excludes_search() {
        assert!(ai_bot_count() >= 5);
        assert!(ai_bots().all(|name| bot_category(name) == Some(AI_CATEGORY)));
        assert!(!ai_bots().any(|name| name.eq_ignore_ascii_case("Googlebot")));
    }
}
