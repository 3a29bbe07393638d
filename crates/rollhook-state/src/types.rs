//! Domain types for the attempt log.
//!
//! These types are serialized directly by the status API, so field names
//! double as the JSON wire format.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollhook_webhook::{WebhookKind, WebhookPayload};

/// Position of a record in the attempt log, assigned in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttemptId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(AttemptId)
    }
}

// ── Notification ───────────────────────────────────────────────

/// A normalized push notification. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    pub payload: WebhookPayload,
    pub kind: WebhookKind,
    /// Network peer the notification came from.
    pub source: String,
    pub received_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Create an event stamped with the current time.
    pub fn new(payload: WebhookPayload, source: impl Into<String>) -> Self {
        Self::received_at(payload, source, Utc::now())
    }

    pub fn received_at(
        payload: WebhookPayload,
        source: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: payload.kind(),
            payload,
            source: source.into(),
            received_at,
        }
    }
}

// ── Failure ────────────────────────────────────────────────────

/// Class of a terminal attempt failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The live controller could not be read.
    #[serde(rename = "FetchError")]
    Fetch,
    /// The new controller was not accepted before the deadline.
    RolloutTimeout,
    /// Any other orchestration backend failure.
    #[serde(rename = "CollaboratorError")]
    Collaborator,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "FetchError",
            Self::RolloutTimeout => "RolloutTimeout",
            Self::Collaborator => "CollaboratorError",
        })
    }
}

/// Why an attempt ended unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// ── Attempt ────────────────────────────────────────────────────

/// Display state derived from a record's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// Received, waiting for the worker.
    Pending,
    /// Discarded in favour of a fresher notification.
    Superseded,
    Running,
    Succeeded,
    Failed,
}

/// One notification and the update attempt (if any) it triggered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub id: AttemptId,
    pub event: NotificationEvent,
    /// Set once the worker starts an update for this record.
    pub attempted: bool,
    /// Content hash of the controller being replaced.
    pub update_id: Option<String>,
    /// Only meaningful once `ended_at` is set.
    pub succeeded: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Progress lines in emission order. Append-only.
    pub status_log: Vec<String>,
    pub error: Option<AttemptFailure>,
    /// The fresher record this one was dropped for, if any.
    pub superseded_by: Option<AttemptId>,
}

impl AttemptRecord {
    pub fn new(id: AttemptId, event: NotificationEvent) -> Self {
        Self {
            id,
            event,
            attempted: false,
            update_id: None,
            succeeded: false,
            started_at: None,
            ended_at: None,
            status_log: Vec::new(),
            error: None,
            superseded_by: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Neither attempted nor dropped in favour of a fresher record.
    pub fn is_waiting(&self) -> bool {
        !self.attempted && self.superseded_by.is_none()
    }

    pub fn state(&self) -> AttemptState {
        match (self.attempted, self.ended_at.is_some()) {
            (false, _) if self.superseded_by.is_some() => AttemptState::Superseded,
            (false, _) => AttemptState::Pending,
            (true, false) => AttemptState::Running,
            (true, true) if self.succeeded => AttemptState::Succeeded,
            (true, true) => AttemptState::Failed,
        }
    }
}
