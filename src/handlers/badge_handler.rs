use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::{db::service_repository::ServiceRepository, models::status::Status, AppState};

/// Public status badge. Viewing a badge for an unknown slug registers it as
/// a pending submission, part of the documented contract rather than an
/// implementation accident.
pub async fn status_badge(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let repo = ServiceRepository::new(&state.db);

    let status = match repo.find_by_slug(&slug).await {
        Ok(Some(service)) => service.status,
        Ok(None) => {
            if let Err(e) = repo.register_pending(&slug).await {
                tracing::warn!("Failed to register pending submission '{}': {:?}", slug, e);
            }
            Status::Unknown
        }
        Err(e) => {
            tracing::error!("Badge lookup failed for '{}': {:?}", slug, e);
            Status::Unknown
        }
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-cache, max-age=60"),
        ],
        render_badge(status),
    )
}

fn render_badge(status: Status) -> String {
    let (label, color) = match status {
        Status::Up => ("up", "#2ecc71"),
        Status::Slow => ("slow", "#f39c12"),
        Status::Down => ("down", "#e74c3c"),
        Status::Dead => ("dead", "#7f8c8d"),
        Status::Unknown => ("unknown", "#95a5a6"),
    };

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="104" height="20" role="img" aria-label="status: {label}">
  <rect width="52" height="20" fill="#555"/>
  <rect x="52" width="52" height="20" fill="{color}"/>
  <g fill="#fff" text-anchor="middle" font-family="Verdana,sans-serif" font-size="11">
    <text x="26" y="14">status</text>
    <text x="78" y="14">{label}</text>
  </g>
</svg>"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_reflects_status() {
        let svg = render_badge(Status::Down);
        assert!(svg.contains("#e74c3c"));
        assert!(svg.contains(">down<"));

        let svg = render_badge(Status::Unknown);
        assert!(svg.contains(">unknown<"));
    }
}
