//! View types for dashboard template rendering.
//!
//! Pre-formatted strings only, so the template carries no logic beyond
//! loops and emptiness checks.

use chrono::{DateTime, Utc};
use rollhook_state::{AttemptRecord, AttemptState, LogSnapshot};

// ── Summary ────────────────────────────────────────────────────

pub struct LogSummary {
    pub total: usize,
    pub pending: usize,
    pub superseded: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// `#id` of the running attempt, empty when idle.
    pub running: String,
}

impl LogSummary {
    pub fn from_snapshot(snapshot: &LogSnapshot) -> Self {
        let count = |state: AttemptState| {
            snapshot
                .records
                .iter()
                .filter(|r| r.state() == state)
                .count()
        };
        Self {
            total: snapshot.records.len(),
            pending: count(AttemptState::Pending),
            superseded: count(AttemptState::Superseded),
            succeeded: count(AttemptState::Succeeded),
            failed: count(AttemptState::Failed),
            running: snapshot
                .in_flight
                .map(|id| format!("#{id}"))
                .unwrap_or_default(),
        }
    }
}

// ── Attempt ────────────────────────────────────────────────────

pub struct AttemptView {
    pub id: String,
    pub state: &'static str,
    pub state_class: &'static str,
    pub kind: String,
    pub repository: String,
    pub source: String,
    pub received: String,
    pub attempted: &'static str,
    pub update_id: String,
    pub started: String,
    pub ended: String,
    pub duration: String,
    pub superseded_by: String,
    pub status_log: Vec<String>,
    pub error: String,
    pub payload_json: String,
}

impl AttemptView {
    pub fn from_record(record: &AttemptRecord) -> Self {
        let state = record.state();
        Self {
            id: record.id.to_string(),
            state: state_label(state),
            state_class: state_class(state),
            kind: record.event.kind.to_string(),
            repository: record
                .event
                .payload
                .repository()
                .unwrap_or("-")
                .to_string(),
            source: record.event.source.clone(),
            received: format_time(&record.event.received_at),
            attempted: if record.attempted { "yes" } else { "no" },
            update_id: record.update_id.clone().unwrap_or_default(),
            started: record.started_at.as_ref().map(format_time).unwrap_or_default(),
            ended: record.ended_at.as_ref().map(format_time).unwrap_or_default(),
            duration: match (record.started_at, record.ended_at) {
                (Some(start), Some(end)) => format_duration(end - start),
                _ => String::new(),
            },
            superseded_by: record
                .superseded_by
                .map(|id| format!("#{id}"))
                .unwrap_or_default(),
            status_log: record.status_log.clone(),
            error: record
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            payload_json: serde_json::to_string_pretty(&record.event.payload).unwrap_or_default(),
        }
    }
}

fn state_label(state: AttemptState) -> &'static str {
    match state {
        AttemptState::Pending => "Pending",
        AttemptState::Superseded => "Superseded",
        AttemptState::Running => "Running",
        AttemptState::Succeeded => "Succeeded",
        AttemptState::Failed => "Failed",
    }
}

fn state_class(state: AttemptState) -> &'static str {
    match state {
        AttemptState::Pending => "badge-pending",
        AttemptState::Superseded => "badge-muted",
        AttemptState::Running => "badge-running",
        AttemptState::Succeeded => "badge-ok",
        AttemptState::Failed => "badge-error",
    }
}

// ── Formatting ─────────────────────────────────────────────────

pub fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_duration(elapsed: chrono::TimeDelta) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    if millis < 1_000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.1}s", millis as f64 / 1_000.0)
    } else {
        format!("{}m {}s", millis / 60_000, (millis % 60_000) / 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use rollhook_state::{AttemptFailure, AttemptId, FailureKind, NotificationEvent};
    use rollhook_webhook::{DockerHubWebhook, DockerRepository, WebhookPayload};

    fn docker_record() -> AttemptRecord {
        let payload = WebhookPayload::DockerHub(DockerHubWebhook {
            repository: Some(DockerRepository {
                repo_name: Some("acme/api".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        let event = NotificationEvent::received_at(payload, "10.1.1.1:4000", ts);
        AttemptRecord::new(AttemptId(7), event)
    }

    #[test]
    fn pending_record_view() {
        let view = AttemptView::from_record(&docker_record());
        assert_eq!(view.id, "7");
        assert_eq!(view.state, "Pending");
        assert_eq!(view.kind, "docker hub");
        assert_eq!(view.repository, "acme/api");
        assert_eq!(view.received, "2026-03-01 12:30:00 UTC");
        assert_eq!(view.attempted, "no");
        assert!(view.duration.is_empty());
        assert!(view.payload_json.contains("acme/api"));
    }

    #[test]
    fn failed_record_view() {
        let mut record = docker_record();
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 31, 0).unwrap();
        record.attempted = true;
        record.started_at = Some(start);
        record.ended_at = Some(start + TimeDelta::milliseconds(2_500));
        record.error = Some(AttemptFailure::new(FailureKind::RolloutTimeout, "web-0a1b not ready"));

        let view = AttemptView::from_record(&record);
        assert_eq!(view.state, "Failed");
        assert_eq!(view.state_class, "badge-error");
        assert_eq!(view.duration, "2.5s");
        assert_eq!(view.error, "RolloutTimeout: web-0a1b not ready");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(TimeDelta::milliseconds(250)), "250ms");
        assert_eq!(format_duration(TimeDelta::seconds(125)), "2m 5s");
        assert_eq!(format_duration(TimeDelta::seconds(-3)), "0ms");
    }

    #[test]
    fn summary_counts_states() {
        let mut superseded = docker_record();
        superseded.superseded_by = Some(AttemptId(8));
        let mut running = docker_record();
        running.id = AttemptId(8);
        running.attempted = true;

        let summary = LogSummary::from_snapshot(&LogSnapshot {
            in_flight: Some(AttemptId(8)),
            records: vec![superseded, running],
        });
        assert_eq!(summary.total, 2);
        assert_eq!(summary.superseded, 1);
        assert_eq!(summary.pending, 0);
        assert_eq!(summary.running, "#8");
    }
}
