use serde::Serializer;
use time::{macros::format_description, OffsetDateTime};

pub fn serialize_offset_datetime<S>(dt: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(value) => {
            const FORMAT: &[time::format_description::FormatItem<'_>]
            = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

            let formatted = value.format(&FORMAT).unwrap_or_else(|_| "Invalid Date".to_string());
            serializer.serialize_str(&formatted)
        },
        None => serializer.serialize_none(),
    }
}

/// Parse a client-supplied RFC 3339 timestamp, e.g. from a bot-visit body.
pub fn parse_rfc3339(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_parsing() {
        assert!(parse_rfc3339("2024-06-01T12:00:00Z").is_some());
        assert!(parse_rfc3339("yesterday").is_none());
    }
}
