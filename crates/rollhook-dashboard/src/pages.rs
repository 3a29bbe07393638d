//! Dashboard page handlers.

use askama::Template;
use axum::extract::State;
use axum::response::Html;
use tracing::error;

use crate::DashboardState;
use crate::views::{AttemptView, LogSummary};

fn render<T: Template>(tmpl: T) -> Html<String> {
    Html(tmpl.render().unwrap_or_else(|e| {
        error!(error = %e, "template render failed");
        format!("<pre>Template error: {e}</pre>")
    }))
}

#[derive(Template)]
#[template(path = "attempts.html")]
struct AttemptsTemplate {
    controller: String,
    summary: LogSummary,
    attempts: Vec<AttemptView>,
}

/// GET /
pub async fn attempts(State(state): State<DashboardState>) -> Html<String> {
    let snapshot = state.log.snapshot();
    let summary = LogSummary::from_snapshot(&snapshot);
    let attempts = snapshot
        .records
        .iter()
        .rev()
        .map(AttemptView::from_record)
        .collect();

    render(AttemptsTemplate {
        controller: state.controller.clone(),
        summary,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollhook_state::{AttemptFailure, AttemptLog, FailureKind, NotificationEvent};
    use rollhook_webhook::{QuayWebhook, WebhookPayload};

    fn state() -> DashboardState {
        DashboardState {
            log: AttemptLog::new(),
            controller: "web".to_string(),
        }
    }

    fn quay(repository: &str) -> WebhookPayload {
        WebhookPayload::Quay(QuayWebhook {
            repository: Some(repository.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn empty_log_renders() {
        let Html(body) = attempts(State(state())).await;
        assert!(body.contains("web"));
        assert!(body.contains("No notifications received yet"));
    }

    #[tokio::test]
    async fn records_render_newest_first() {
        let state = state();
        state.log.append(NotificationEvent::new(quay("acme/first"), "10.0.0.1:1"));
        state.log.append(NotificationEvent::new(quay("acme/second"), "10.0.0.2:2"));

        let Html(body) = attempts(State(state)).await;
        let first = body.find("acme/first").unwrap();
        let second = body.find("acme/second").unwrap();
        assert!(second < first);
        assert!(body.contains("10.0.0.2:2"));
        assert!(body.contains("quay.io"));
    }

    #[tokio::test]
    async fn failure_and_trace_are_shown() {
        let state = state();
        let id = state.log.append(NotificationEvent::new(quay("acme/web"), "peer"));
        state.log.begin(id);
        state.log.push_status(id, "Created web-0a1b2c");
        state
            .log
            .finish(id, Err(AttemptFailure::new(FailureKind::Fetch, "controller missing")));

        let Html(body) = attempts(State(state)).await;
        assert!(body.contains("Created web-0a1b2c"));
        assert!(body.contains("FetchError: controller missing"));
    }

    #[tokio::test]
    async fn untrusted_text_is_escaped() {
        let state = state();
        state
            .log
            .append(NotificationEvent::new(quay("acme/web"), "<script>alert(1)</script>"));

        let Html(body) = attempts(State(state)).await;
        assert!(!body.contains("<script>alert(1)</script>"));
    }
}
