use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::models::status::Status;
use crate::utils::datetime::serialize_offset_datetime;

/// One append-only status record per probe or heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusObservation {
    pub id: u64,
    pub service_id: u64,
    pub status: Status,
    pub latency_ms: Option<i32>,
    pub status_code: Option<i32>,
    #[serde(serialize_with = "serialize_offset_datetime")]
    pub observed_at: Option<OffsetDateTime>,
}
