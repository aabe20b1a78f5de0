//! AI-visibility composite score.
//!
//! Pure over a pre-fetched traffic window so the arithmetic is testable
//! without a database: four independently-capped sub-scores, summed and
//! clamped to [0, 100].

use sqlx::MySqlPool;
use time::OffsetDateTime;

use crate::db::bot_visit_repository::BotVisitRepository;
use crate::services::bot_rollup::{ai_bot_count, ai_bots, AI_CATEGORY};

/// Aggregated AI-crawler traffic for one domain over one lookback window.
#[derive(Debug, Clone, Default)]
pub struct TrafficWindow {
    pub distinct_bots: Vec<String>,
    pub total_visits: i64,
    pub distinct_pages: i64,
    /// Total visits in the immediately preceding equal-length window;
    /// `None` means the domain has no data before this window at all.
    pub previous_total: Option<i64>,
    pub days: u32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct VisibilityScore {
    pub total: u8,
    pub diversity: u8,
    pub frequency: u8,
    pub coverage: u8,
    pub trend: u8,
    pub label: &'static str,
    pub missing_bots: Vec<&'static str>,
}

/// Compute the 0-100 score: diversity (30) + frequency (30) + coverage (20)
/// + trend (20).
pub fn score(window: &TrafficWindow) -> VisibilityScore {
    let bot_total = ai_bot_count() as f64;
    let seen = window.distinct_bots.len() as f64;
    let diversity = (seen.min(bot_total) / bot_total * 30.0).round() as u8;

    let avg_daily = window.total_visits as f64 / f64::from(window.days.max(1));
    let frequency = ((avg_daily + 1.0).log10() * 15.0).min(30.0).round() as u8;

    let coverage = ((window.distinct_pages as f64 / 20.0).min(1.0) * 20.0).round() as u8;

    let trend = trend_points(window.total_visits, window.previous_total);

    let total = u32::from(diversity) + u32::from(frequency) + u32::from(coverage) + u32::from(trend);
    let total = total.min(100) as u8;

    let label = if total <= 30 {
        "Low"
    } else if total <= 60 {
        "Medium"
    } else {
        "High"
    };

    let missing_bots = ai_bots()
        .filter(|known| {
            !window
                .distinct_bots
                .iter()
                .any(|seen| seen.eq_ignore_ascii_case(known))
        })
        .collect();

    VisibilityScore {
        total,
        diversity,
        frequency,
        coverage,
        trend,
        label,
        missing_bots,
    }
}

/// Step function over the percent change vs. the previous period. A domain
/// with no previous data counts as +100%.
fn trend_points(current: i64, previous: Option<i64>) -> u8 {
    let percent = match previous {
        None => 100.0,
        Some(0) => {
            if current > 0 {
                100.0
            } else {
                0.0
            }
        }
        Some(prev) => (current - prev) as f64 / prev as f64 * 100.0,
    };

    if percent >= 50.0 {
        20
    } else if percent >= 20.0 {
        15
    } else if percent >= 0.0 {
        10
    } else if percent >= -20.0 {
        5
    } else {
        0
    }
}

/// Fetch the two windows for a domain and score them.
pub async fn score_domain(
    pool: &MySqlPool,
    user_id: u64,
    domain: &str,
    days: u32,
) -> Result<VisibilityScore, sqlx::Error> {
    let repo = BotVisitRepository::new(pool);

    let now = OffsetDateTime::now_utc();
    let window_start = now - time::Duration::days(i64::from(days));
    let previous_start = window_start - time::Duration::days(i64::from(days));

    let totals = repo
        .traffic_totals(user_id, domain, AI_CATEGORY, window_start, now)
        .await?;

    let previous_total = if repo
        .has_any_traffic(user_id, domain, AI_CATEGORY, window_start)
        .await?
    {
        Some(
            repo.total_visits(user_id, domain, AI_CATEGORY, previous_start, window_start)
                .await?,
        )
    } else {
        None
    };

    Ok(score(&TrafficWindow {
        distinct_bots: totals.distinct_bots,
        total_visits: totals.total_visits,
        distinct_pages: totals.distinct_pages,
        previous_total,
        days,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(bots: &[&str], visits: i64, pages: i64, previous: Option<i64>) -> TrafficWindow {
        TrafficWindow {
            distinct_bots: bots.iter().map(|b| b.to_string()).collect(),
            total_visits: visits,
            distinct_pages: pages,
            previous_total: previous,
            days: 7,
        }
    }

    #[test]
    fn empty_window_scores_low_but_in_range() {
        let s = score(&window(&[], 0, 0, Some(0)));
        assert_eq!(s.diversity, 0);
        assert_eq!(s.coverage, 0);
        assert_eq!(s.frequency, 0);
        assert_eq!(s.trend, 10); // 0% change
        assert!(s.total <= 100);
        assert_eq!(s.label, "Low");
        assert_eq!(s.missing_bots.len(), ai_bot_count());
    }

    #[test]
    fn saturated_window_hits_the_cap_exactly() {
        let all: Vec<&str> = ai_bots().collect();
        let s = score(&window(&all, 70_000, 40, Some(10)));
        assert_eq!(s.diversity, 30);
        assert_eq!(s.frequency, 30);
        assert_eq!(s.coverage, 20);
        assert_eq!(s.trend, 20);
        assert_eq!(s.total, 100);
        assert_eq!(s.label, "High");
        assert!(s.missing_bots.is_empty());
    }

    #[test]
    fn diversity_is_monotonic_in_distinct_bots() {
        let mut previous = 0;
        let all: Vec<&str> = ai_bots().collect();
        for n in 0..=all.len() {
            let s = score(&window(&all[..n], 100, 5, Some(100)));
            assert!(s.diversity >= previous);
            previous = s.diversity;
        }
    }

    #[test]
    fn frequency_is_monotonic_in_visits() {
        let mut previous = 0;
        for visits in [0, 7, 70, 700, 7_000, 70_000] {
            let s = score(&window(&["GPTBot"], visits, 5, Some(visits)));
            assert!(s.frequency >= previous);
            previous = s.frequency;
        }
    }

    #[test]
    fn trend_steps() {
        assert_eq!(trend_points(150, Some(100)), 20); // +50%
        assert_eq!(trend_points(125, Some(100)), 15); // +25%
        assert_eq!(trend_points(100, Some(100)), 10); // flat
        assert_eq!(trend_points(85, Some(100)), 5); // -15%
        assert_eq!(trend_points(50, Some(100)), 0); // -50%
        assert_eq!(trend_points(10, None), 20); // first-ever data
        assert_eq!(trend_points(10, Some(0)), 20); // growth from nothing
    }

    #[test]
    fn labels_follow_bands() {
        assert_eq!(score(&window(&[], 0, 0, Some(0))).label, "Low");
        let some: Vec<&str> = ai_bots().take(5).collect();
        let medium = score(&window(&some, 200, 8, Some(200)));
        assert!(medium.total > 30 && medium.total <= 60, "total was {}", medium.total);
        assert_eq!(medium.label, "Medium");
    }

    #[test]
    fn missing_bots_shrink_as_coverage_grows() {
        let none = score(&window(&[], 10, 1, None));
        let one = score(&window(&["GPTBot"], 10, 1, None));
        assert_eq!(none.missing_bots.len(), one.missing_bots.len() + 1);
        assert!(!one.missing_bots.contains(&"GPTBot"));
    }
}
