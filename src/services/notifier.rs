//! Webhook fan-out for status transitions and periodic alerts.
//!
//! Deliveries are fire-and-forget: every send gets its own short timeout,
//! failures are logged and swallowed, and the batch is awaited to settlement
//! so one broken endpoint never blocks or cancels its siblings.

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use serde_json::{json, Value};
use sqlx::MySqlPool;
use time::OffsetDateTime;

use crate::db::{
    alert_state_repository::AlertStateRepository, webhook_repository::WebhookRepository,
};
use crate::models::{
    status::Status,
    webhook::{Webhook, WebhookKind},
};
use crate::services::transition::{Transition, TransitionEvent};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Cooldown window for alerts not tied to a status transition.
pub const ALERT_COOLDOWN_HOURS: i64 = 48;

/// Dispatch every transition in the batch to every subscribed webhook.
/// All deliveries are issued concurrently; the call returns once they have
/// all settled, successfully or not.
pub async fn notify_transitions(pool: &MySqlPool, client: &Client, transitions: &[Transition]) {
    let webhook_repo = WebhookRepository::new(pool);
    let mut deliveries = Vec::new();

    for transition in transitions {
        let event = transition.event();

        let hooks = match webhook_repo.subscribed_to(transition.service.id).await {
            Ok(hooks) => hooks,
            Err(e) => {
                tracing::error!(
                    "Failed to load webhooks for service_id {}: {:?}",
                    transition.service.id, e
                );
                continue;
            }
        };

        for hook in hooks.into_iter().filter(|h| h.wants(event.as_str())) {
            let payload = render_payload(hook.kind, event, transition);
            deliveries.push(deliver(client.clone(), hook, payload));
        }
    }

    if deliveries.is_empty() {
        return;
    }

    tracing::info!(
        "Dispatching {} webhook deliveries for {} transitions",
        deliveries.len(),
        transitions.len()
    );

    join_all(deliveries).await;
}

/// POST one payload. Never returns an error; failures are logged at warn.
async fn deliver(client: Client, hook: Webhook, payload: Value) {
    let result = client
        .post(&hook.url)
        .timeout(DELIVERY_TIMEOUT)
        .json(&payload)
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().is_success() => {
            tracing::debug!("Webhook {} delivered ({})", hook.id, resp.status());
        }
        Ok(resp) => {
            tracing::warn!("Webhook {} responded {}", hook.id, resp.status());
        }
        Err(e) => {
            tracing::warn!("Webhook {} delivery failed: {}", hook.id, e);
        }
    }
}

/// Render the transition for the webhook's format.
pub fn render_payload(kind: WebhookKind, event: TransitionEvent, transition: &Transition) -> Value {
    let service = &transition.service;
    let summary = format!(
        "{} is {} (was {})",
        service.name,
        transition.new.as_str(),
        transition.previous.as_str()
    );

    match kind {
        WebhookKind::Discord => json!({
            "embeds": [{
                "title": summary,
                "description": format!("https://{}", service.domain),
                "color": status_color(transition.new),
                "footer": { "text": format!("event: {}", event.as_str()) },
            }]
        }),
        WebhookKind::Slack => json!({
            "blocks": [{
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*{}*\nhttps://{}", summary, service.domain),
                }
            }]
        }),
        WebhookKind::Custom => json!({
            "event": event.as_str(),
            "service": service.name,
            "domain": service.domain,
            "status": transition.new.as_str(),
            "previous_status": transition.previous.as_str(),
            "latency_ms": service.latency_ms,
            "occurred_at": OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
        }),
    }
}

fn status_color(status: Status) -> u32 {
    match status {
        Status::Up => 0x2ecc71,
        Status::Slow => 0xf39c12,
        Status::Down => 0xe74c3c,
        Status::Dead => 0x7f8c8d,
        Status::Unknown => 0x95a5a6,
    }
}

/// Send a periodic, non-transition alert at most once per cooldown window
/// per `(user, domain, alert_type)`. Returns whether anything was sent.
pub async fn alert_once(
    pool: &MySqlPool,
    client: &Client,
    user_id: u64,
    domain: &str,
    alert_type: &str,
    message: &str,
) -> bool {
    let alert_repo = AlertStateRepository::new(pool);
    let since = OffsetDateTime::now_utc() - time::Duration::hours(ALERT_COOLDOWN_HOURS);

    match alert_repo.recently_alerted(user_id, domain, alert_type, since).await {
        Ok(true) => {
            tracing::info!(
                "Alert '{}' already sent recently for user_id {} domain {}",
                alert_type, user_id, domain
            );
            return false;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Failed to check alert cooldown: {:?}", e);
            return false;
        }
    }

    let hooks = match WebhookRepository::new(pool).for_user(user_id).await {
        Ok(hooks) => hooks,
        Err(e) => {
            tracing::error!("Failed to load webhooks for user_id {}: {:?}", user_id, e);
            return false;
        }
    };

    let deliveries: Vec<_> = hooks
        .into_iter()
        .filter(|h| h.wants(alert_type))
        .map(|hook| {
            let payload = match hook.kind {
                WebhookKind::Discord => json!({
                    "embeds": [{ "title": message, "description": domain, "color": 0xf39c12 }]
                }),
                WebhookKind::Slack => json!({
                    "blocks": [{
                        "type": "section",
                        "text": { "type": "mrkdwn", "text": format!("*{}*\n{}", message, domain) }
                    }]
                }),
                WebhookKind::Custom => json!({
                    "event": alert_type,
                    "domain": domain,
                    "message": message,
                }),
            };
            deliver(client.clone(), hook, payload)
        })
        .collect();

    if deliveries.is_empty() {
        return false;
    }

    join_all(deliveries).await;

    if let Err(e) = alert_repo.mark_alerted(user_id, domain, alert_type).await {
        tracing::error!("Failed to record alert state: {:?}", e);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::service::Service;
    use crate::services::transition::Transition;

    fn sample_transition() -> Transition {
        Transition {
            service: Service {
                id: 7,
                user_id: Some(1),
                name: "api.acme.io".into(),
                slug: "api-acme-io".into(),
                domain: "api.acme.io".into(),
                health_url: None,
                status: Status::Down,
                latency_ms: Some(230),
                last_checked_at: None,
                last_heartbeat_at: None,
                feed_url: None,
                feed_provider: None,
                pending: false,
                is_active: true,
            },
            previous: Status::Up,
            new: Status::Down,
        }
    }

    #[test]
    fn discord_payload_is_an_embed() {
        let t = sample_transition();
        let payload = render_payload(WebhookKind::Discord, t.event(), &t);
        let embed = &payload["embeds"][0];
        assert!(embed["title"].as_str().unwrap().contains("api.acme.io is down"));
        assert_eq!(embed["color"].as_u64(), Some(0xe74c3c));
    }

    #[test]
    fn slack_payload_uses_blocks() {
        let t = sample_transition();
        let payload = render_payload(WebhookKind::Slack, t.event(), &t);
        assert_eq!(payload["blocks"][0]["type"], "section");
    }

    #[test]
    fn custom_payload_is_flat() {
        let t = sample_transition();
        let payload = render_payload(WebhookKind::Custom, t.event(), &t);
        assert_eq!(payload["event"], "down");
        assert_eq!(payload["status"], "down");
        assert_eq!(payload["previous_status"], "up");
        assert_eq!(payload["domain"], "api.acme.io");
    }

    #[tokio::test]
    async fn failing_delivery_does_not_block_siblings() {
        // Two deliveries to unreachable endpoints settle without panicking
        // or propagating an error.
        let client = Client::new();
        let hook = |id: u64| Webhook {
            id,
            user_id: 1,
            url: "http://127.0.0.1:1/unreachable".into(),
            kind: WebhookKind::Custom,
            events: "down".into(),
            active: true,
        };

        join_all(vec![
            deliver(client.clone(), hook(1), json!({"event": "down"})),
            deliver(client.clone(), hook(2), json!({"event": "down"})),
        ])
        .await;
    }
}
