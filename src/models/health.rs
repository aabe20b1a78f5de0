use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Health payload as published by a monitored service, either served from
/// its `/api/health` endpoint or pushed to us as a heartbeat.
///
/// `checks` maps a free-form dependency name to its own mini-verdict;
/// absence means the service reports a whole-service verdict only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckPayload {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<HashMap<String, HealthCheck>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    #[serde(default)]
    pub latency: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheckPayload {
    /// True when the top-level verdict or any dependency check reports an error.
    pub fn has_error(&self) -> bool {
        if self.status == "error" {
            return true;
        }
        self.checks
            .as_ref()
            .map(|checks| checks.values().any(|c| c.status == "error"))
            .unwrap_or(false)
    }

    /// Worst reported dependency latency, used as the service's latency.
    pub fn max_check_latency(&self) -> Option<i64> {
        self.checks
            .as_ref()
            .and_then(|checks| checks.values().filter_map(|c| c.latency).max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(status: &str, checks: &[(&str, &str, Option<i64>)]) -> HealthCheckPayload {
        let map: HashMap<String, HealthCheck> = checks
            .iter()
            .map(|(name, status, latency)| {
                (
                    name.to_string(),
                    HealthCheck {
                        status: status.to_string(),
                        latency: *latency,
                        message: None,
                    },
                )
            })
            .collect();
        HealthCheckPayload {
            status: status.to_string(),
            checks: if map.is_empty() { None } else { Some(map) },
        }
    }

    #[test]
    fn error_detection() {
        assert!(payload("error", &[]).has_error());
        assert!(payload("ok", &[("db", "error", None)]).has_error());
        assert!(!payload("ok", &[("db", "ok", Some(12))]).has_error());
        assert!(!payload("degraded", &[]).has_error());
    }

    #[test]
    fn max_latency_across_checks() {
        let p = payload("ok", &[("db", "ok", Some(40)), ("cache", "ok", Some(250))]);
        assert_eq!(p.max_check_latency(), Some(250));
        assert_eq!(payload("ok", &[]).max_check_latency(), None);
    }
}
