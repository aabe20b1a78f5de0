use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::utils::datetime::serialize_offset_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum IncidentStatus {
    Investigating,
    Identified,
    Monitoring,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::Identified => "identified",
            IncidentStatus::Monitoring => "monitoring",
            IncidentStatus::Resolved => "resolved",
        }
    }

    /// Map a provider status string; anything unrecognized counts as resolved.
    pub fn from_provider(value: &str) -> Self {
        match value {
            "investigating" => IncidentStatus::Investigating,
            "identified" => IncidentStatus::Identified,
            "monitoring" => IncidentStatus::Monitoring,
            _ => IncidentStatus::Resolved,
        }
    }
}

/// Stored incident. `source_id` is unique per service and is the idempotency
/// key for repeated feed imports.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Incident {
    pub id: u64,
    pub service_id: u64,
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    #[serde(serialize_with = "serialize_offset_datetime")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(serialize_with = "serialize_offset_datetime")]
    pub resolved_at: Option<OffsetDateTime>,
    pub source_url: Option<String>,
}

/// Parsed incident produced by a feed parser, before it is attached to a
/// service and upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub started_at: OffsetDateTime,
    pub resolved_at: Option<OffsetDateTime>,
    pub source_url: Option<String>,
}
