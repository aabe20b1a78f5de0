//! Normalizers for external incident feeds.
//!
//! Three formats come in (Statuspage/incident.io JSON, RSS, Atom), one
//! incident shape comes out. All parsers tolerate malformed input by
//! returning an empty list.

use serde_json::Value;
use sha2::{Digest, Sha256};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::models::incident::{IncidentStatus, NewIncident, Severity};

pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Parse a Statuspage / incident.io style JSON document.
pub fn parse_statuspage(raw: &str, base_url: &str) -> Vec<NewIncident> {
    let root: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => return Vec::new(),
    };

    let incidents = match root.get("incidents").and_then(|v| v.as_array()) {
        Some(list) => list,
        None => return Vec::new(),
    };

    incidents
        .iter()
        .filter_map(|incident| statuspage_incident(incident, base_url))
        .collect()
}

fn statuspage_incident(incident: &Value, base_url: &str) -> Option<NewIncident> {
    let source_id = incident.get("id").and_then(|v| v.as_str())?.to_string();

    let title = incident
        .get("name")
        .and_then(|v| v.as_str())
        .map(clean_text)
        .unwrap_or_else(|| "Untitled incident".to_string());

    let severity = match incident.get("impact").and_then(|v| v.as_str()).unwrap_or("") {
        "critical" => Severity::Critical,
        "major" => Severity::Major,
        _ => Severity::Minor,
    };

    let status = IncidentStatus::from_provider(
        incident.get("status").and_then(|v| v.as_str()).unwrap_or(""),
    );

    // incident_updates come newest-first; the first body is the latest word.
    let description = incident
        .get("incident_updates")
        .and_then(|v| v.as_array())
        .and_then(|updates| updates.first())
        .and_then(|update| update.get("body"))
        .and_then(|v| v.as_str())
        .map(clean_text)
        .unwrap_or_default();

    let started_at = incident
        .get("started_at")
        .or_else(|| incident.get("created_at"))
        .and_then(|v| v.as_str())
        .and_then(parse_rfc3339_date)
        .unwrap_or_else(OffsetDateTime::now_utc);

    let resolved_at = incident
        .get("resolved_at")
        .and_then(|v| v.as_str())
        .and_then(parse_rfc3339_date);

    let source_url = incident
        .get("shortlink")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| {
            Some(format!(
                "{}/incidents/{}",
                base_url.trim_end_matches('/'),
                source_id
            ))
        });

    Some(NewIncident {
        source_id,
        title,
        description,
        severity,
        status,
        started_at,
        resolved_at,
        source_url,
    })
}

/// Parse an RSS feed by `<item>` tag scanning.
pub fn parse_rss(raw: &str, base_url: &str) -> Vec<NewIncident> {
    extract_blocks(raw, "item")
        .into_iter()
        .filter_map(|block| {
            let title = extract_tag(block, "title")?;
            let description = extract_tag(block, "description").unwrap_or_default();
            let link = extract_tag(block, "link").or_else(|| extract_tag(block, "guid"));
            let date = extract_tag(block, "pubDate")
                .as_deref()
                .and_then(parse_rfc2822_date);
            syndication_incident(&title, &description, link.as_deref(), date, base_url)
        })
        .collect()
}

/// Parse an Atom feed by `<entry>` tag scanning.
pub fn parse_atom(raw: &str, base_url: &str) -> Vec<NewIncident> {
    extract_blocks(raw, "entry")
        .into_iter()
        .filter_map(|block| {
            let title = extract_tag(block, "title")?;
            let description = extract_tag(block, "content")
                .or_else(|| extract_tag(block, "summary"))
                .unwrap_or_default();
            let link = extract_attr(block, "link", "href")
                .or_else(|| extract_tag(block, "id"));
            let date = extract_tag(block, "updated")
                .or_else(|| extract_tag(block, "published"))
                .as_deref()
                .and_then(parse_rfc3339_date);
            syndication_incident(&title, &description, link.as_deref(), date, base_url)
        })
        .collect()
}

fn syndication_incident(
    title: &str,
    description: &str,
    link: Option<&str>,
    date: Option<OffsetDateTime>,
    base_url: &str,
) -> Option<NewIncident> {
    let title = clean_text(title);
    let description = clean_text(description);
    if title.is_empty() {
        return None;
    }

    let haystack = format!("{} {}", title, description).to_lowercase();
    let severity = guess_severity(&haystack);
    let status = guess_status(&haystack);

    let started_at = date.unwrap_or_else(OffsetDateTime::now_utc);
    let date_key = date
        .and_then(|d| d.format(&Rfc3339).ok())
        .unwrap_or_default();

    let source_id = link
        .and_then(last_path_segment)
        .unwrap_or_else(|| stable_hash(&title, &date_key));

    let resolved_at = if status == IncidentStatus::Resolved {
        Some(started_at)
    } else {
        None
    };

    let source_url = link
        .map(str::to_string)
        .or_else(|| Some(base_url.to_string()));

    Some(NewIncident {
        source_id,
        title,
        description,
        severity,
        status,
        started_at,
        resolved_at,
        source_url,
    })
}

/// Severity guessed from keywords in title + description (lowercased).
fn guess_severity(text: &str) -> Severity {
    const CRITICAL: &[&str] = &["critical", "major outage", "fully down", "complete"];
    const MAJOR: &[&str] = &["major", "significant", "widespread", "degraded"];

    if CRITICAL.iter().any(|kw| text.contains(kw)) {
        Severity::Critical
    } else if MAJOR.iter().any(|kw| text.contains(kw)) {
        Severity::Major
    } else {
        Severity::Minor
    }
}

fn guess_status(text: &str) -> IncidentStatus {
    const RESOLVED: &[&str] = &["resolved", "completed", "fixed", "recovered"];

    if RESOLVED.iter().any(|kw| text.contains(kw)) {
        IncidentStatus::Resolved
    } else {
        IncidentStatus::Investigating
    }
}

/// All `<tag>...</tag>` bodies at any depth, in document order.
fn extract_blocks<'a>(raw: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(found) = raw[cursor..].find(&open) {
        let after_name = cursor + found + open.len();

        // Reject prefixes of longer tag names (<item must not match <itemref).
        match raw[after_name..].chars().next() {
            Some('>') | Some(' ') | Some('\t') | Some('\r') | Some('\n') | Some('/') => {}
            _ => {
                cursor = after_name;
                continue;
            }
        }

        let Some(gt) = raw[after_name..].find('>') else { break };
        let body_start = after_name + gt + 1;
        let Some(end) = raw[body_start..].find(&close) else { break };

        blocks.push(&raw[body_start..body_start + end]);
        cursor = body_start + end + close.len();
    }

    blocks
}

/// First `<tag>` body inside a block, CDATA unwrapped, or `None` when empty.
fn extract_tag(block: &str, tag: &str) -> Option<String> {
    let inner = extract_blocks(block, tag).into_iter().next()?.trim();
    let inner = inner
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(inner)
        .trim();

    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Attribute value from the first `<tag ...>` occurrence, for self-closing
/// tags like Atom's `<link href="..."/>`.
fn extract_attr(block: &str, tag: &str, attr: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let start = block.find(&open)?;
    let rest = &block[start..];
    let end = rest.find('>')?;
    let tag_src = &rest[..end];

    let needle = format!("{}=\"", attr);
    let value_start = tag_src.find(&needle)? + needle.len();
    let value_len = tag_src[value_start..].find('"')?;

    Some(tag_src[value_start..value_start + value_len].to_string())
}

/// Last path segment of a link, the natural per-item id in status feeds.
/// A bare host with no path yields `None`.
fn last_path_segment(link: &str) -> Option<String> {
    let link = link
        .split(['?', '#'])
        .next()
        .unwrap_or(link)
        .trim_end_matches('/');

    let without_scheme = link.split_once("://").map(|(_, rest)| rest).unwrap_or(link);
    let (_, path) = without_scheme.split_once('/')?;

    let segment = path.trim_end_matches('/').rsplit('/').next()?.trim();
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

/// Stable fallback id for items without a usable link.
fn stable_hash(title: &str, date: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(date.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

/// Decode the five standard entities, strip tags (feeds carry both literal
/// and entity-escaped markup), trim, and cap the length.
fn clean_text(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let stripped = strip_html(&decoded);
    let trimmed = stripped.trim();

    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        trimmed.chars().take(MAX_DESCRIPTION_LEN).collect()
    } else {
        trimmed.to_string()
    }
}

fn strip_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;

    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}

fn decode_entities(raw: &str) -> String {
    // &amp; last, so "&amp;lt;" decodes to the literal "&lt;".
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn parse_rfc3339_date(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).ok()
}

fn parse_rfc2822_date(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value.trim(), &Rfc2822).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUSPAGE_SAMPLE: &str = r#"{
        "incidents": [
            {
                "id": "abc123",
                "name": "Elevated API error rates",
                "impact": "major",
                "status": "monitoring",
                "started_at": "2024-06-01T10:00:00Z",
                "resolved_at": null,
                "shortlink": "https://stspg.io/abc123",
                "incident_updates": [
                    {"body": "<p>We are seeing recovery.</p>"},
                    {"body": "Investigating elevated error rates."}
                ]
            },
            {
                "id": "def456",
                "name": "Database outage",
                "impact": "critical",
                "status": "postmortem",
                "started_at": "2024-05-28T08:30:00Z",
                "resolved_at": "2024-05-28T09:15:00Z",
                "incident_updates": []
            }
        ]
    }"#;

    #[test]
    fn statuspage_maps_fields() {
        let incidents = parse_statuspage(STATUSPAGE_SAMPLE, "https://status.acme.io");
        assert_eq!(incidents.len(), 2);

        let first = &incidents[0];
        assert_eq!(first.source_id, "abc123");
        assert_eq!(first.severity, Severity::Major);
        assert_eq!(first.status, IncidentStatus::Monitoring);
        assert_eq!(first.description, "We are seeing recovery.");
        assert_eq!(first.source_url.as_deref(), Some("https://stspg.io/abc123"));

        let second = &incidents[1];
        assert_eq!(second.severity, Severity::Critical);
        // Unrecognized provider status maps to resolved.
        assert_eq!(second.status, IncidentStatus::Resolved);
        assert!(second.resolved_at.is_some());
        assert_eq!(
            second.source_url.as_deref(),
            Some("https://status.acme.io/incidents/def456")
        );
    }

    #[test]
    fn statuspage_tolerates_garbage() {
        assert!(parse_statuspage("not json at all", "https://x").is_empty());
        assert!(parse_statuspage("{\"page\": {}}", "https://x").is_empty());
        assert!(parse_statuspage("{\"incidents\": 42}", "https://x").is_empty());
    }

    const RSS_SAMPLE: &str = r#"<?xml version="1.0"?>
    <rss version="2.0"><channel>
        <title>Acme Status</title>
        <item>
            <title><![CDATA[Major outage affecting EU region]]></title>
            <link>https://status.acme.io/incidents/eu-outage-42</link>
            <pubDate>Sat, 01 Jun 2024 10:00:00 +0000</pubDate>
            <description>&lt;p&gt;We are investigating a widespread failure.&lt;/p&gt;</description>
        </item>
        <item>
            <title>Scheduled maintenance completed</title>
            <guid>https://status.acme.io/incidents/maint-7</guid>
            <pubDate>Fri, 31 May 2024 02:00:00 +0000</pubDate>
            <description>Maintenance is now complete. All systems operational.</description>
        </item>
        <item>
            <title>Minor latency blip</title>
            <description>Brief slowdown, no action needed.</description>
        </item>
    </channel></rss>"#;

    #[test]
    fn rss_extracts_and_classifies_items() {
        let incidents = parse_rss(RSS_SAMPLE, "https://status.acme.io/feed");
        assert_eq!(incidents.len(), 3);

        let outage = &incidents[0];
        assert_eq!(outage.source_id, "eu-outage-42");
        // "major outage" is a critical keyword and outranks plain "major".
        assert_eq!(outage.severity, Severity::Critical);
        assert_eq!(outage.status, IncidentStatus::Investigating);
        assert_eq!(
            outage.description,
            "We are investigating a widespread failure."
        );

        let maintenance = &incidents[1];
        assert_eq!(maintenance.source_id, "maint-7");
        assert_eq!(maintenance.status, IncidentStatus::Resolved);
        assert!(maintenance.resolved_at.is_some());

        // No link and no date: still gets a stable hash id.
        let blip = &incidents[2];
        assert_eq!(blip.source_id.len(), 16);
        assert_eq!(blip.severity, Severity::Minor);
    }

    #[test]
    fn rss_source_ids_are_stable_across_reparses() {
        let first = parse_rss(RSS_SAMPLE, "https://x");
        let second = parse_rss(RSS_SAMPLE, "https://x");
        let first_ids: Vec<_> = first.iter().map(|i| i.source_id.clone()).collect();
        let second_ids: Vec<_> = second.iter().map(|i| i.source_id.clone()).collect();
        assert_eq!(first_ids, second_ids);
    }

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
    <feed xmlns="http://www.w3.org/2005/Atom">
        <title>Acme Status</title>
        <entry>
            <id>tag:status.acme.io,2024:incident/9981</id>
            <title>Degraded performance on uploads</title>
            <link href="https://status.acme.io/incidents/9981"/>
            <updated>2024-06-02T14:30:00Z</updated>
            <content type="html">&lt;b&gt;Uploads&lt;/b&gt; are slower than usual.</content>
        </entry>
        <entry>
            <id>tag:status.acme.io,2024:incident/9982</id>
            <title>Upload performance recovered</title>
            <link href="https://status.acme.io/incidents/9982"/>
            <published>2024-06-02T16:00:00Z</published>
            <summary>Fixed and back to normal.</summary>
        </entry>
    </feed>"#;

    #[test]
    fn atom_extracts_entries() {
        let incidents = parse_atom(ATOM_SAMPLE, "https://status.acme.io/atom");
        assert_eq!(incidents.len(), 2);

        let degraded = &incidents[0];
        assert_eq!(degraded.source_id, "9981");
        assert_eq!(degraded.severity, Severity::Major);
        assert_eq!(degraded.status, IncidentStatus::Investigating);
        assert_eq!(degraded.description, "Uploads are slower than usual.");

        let recovered = &incidents[1];
        assert_eq!(recovered.source_id, "9982");
        assert_eq!(recovered.status, IncidentStatus::Resolved);
    }

    #[test]
    fn malformed_xml_yields_empty_lists() {
        assert!(parse_rss("<rss><channel><item><title>Broken", "https://x").is_empty());
        assert!(parse_atom("", "https://x").is_empty());
        assert!(parse_rss("plain text, no tags", "https://x").is_empty());
    }

    #[test]
    fn entity_decoding_and_tag_stripping() {
        assert_eq!(
            decode_entities("a &amp; b &lt;c&gt; &quot;d&quot; &#39;e&#39;"),
            "a & b <c> \"d\" 'e'"
        );
        assert_eq!(strip_html("<p>hello <b>world</b></p>"), "hello world");
        // Entity-escaped markup decodes first, then gets stripped like any tag.
        assert_eq!(clean_text("&lt;p&gt;hello&lt;/p&gt;"), "hello");
    }

    #[test]
    fn descriptions_are_capped() {
        let long = "x".repeat(5000);
        assert_eq!(clean_text(&long).chars().count(), MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn last_path_segment_handles_edge_cases() {
        assert_eq!(
            last_path_segment("https://x.io/incidents/abc?utm=1"),
            Some("abc".to_string())
        );
        assert_eq!(
            last_path_segment("https://x.io/incidents/abc/"),
            Some("abc".to_string())
        );
        assert_eq!(last_path_segment("https://x.io"), None);
    }
}
