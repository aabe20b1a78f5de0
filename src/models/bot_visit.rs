use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::utils::datetime::serialize_offset_datetime;

/// Hourly aggregate, unique on `(user_id, domain, bot_name, path, hour_bucket)`.
/// Raw per-visit rows only live until the next rollup and never leave the
/// persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BotVisitHourly {
    pub id: u64,
    pub user_id: u64,
    pub domain: String,
    pub bot_name: String,
    pub bot_category: String,
    pub path: String,
    #[serde(serialize_with = "serialize_offset_datetime")]
    pub hour_bucket: Option<OffsetDateTime>,
    pub visit_count: i64,
}
