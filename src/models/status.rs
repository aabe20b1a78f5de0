use serde::{Deserialize, Serialize};

/// Classified state of a monitored service.
///
/// Ordering is by severity: `Up < Slow < Down < Dead`. `Unknown` means no
/// observation has been recorded yet and sorts below everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Status {
    Unknown,
    Up,
    Slow,
    Down,
    Dead,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Up => "up",
            Status::Slow => "slow",
            Status::Down => "down",
            Status::Dead => "dead",
        }
    }

    /// Parse a stored status string. Anything unrecognized maps to `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "up" => Status::Up,
            "slow" => Status::Slow,
            "down" => Status::Down,
            "dead" => Status::Dead,
            _ => Status::Unknown,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Status::Up < Status::Slow);
        assert!(Status::Slow < Status::Down);
        assert!(Status::Down < Status::Dead);
        assert!(Status::Unknown < Status::Up);
    }

    #[test]
    fn parse_roundtrip() {
        for s in [Status::Up, Status::Slow, Status::Down, Status::Dead, Status::Unknown] {
            assert_eq!(Status::parse(s.as_str()), s);
        }
        assert_eq!(Status::parse("something else"), Status::Unknown);
    }
}
