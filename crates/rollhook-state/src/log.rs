//! The shared attempt log.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::*;

#[derive(Default)]
struct LogInner {
    records: Vec<AttemptRecord>,
    /// The single attempt currently between `begin` and `finish`.
    in_flight: Option<AttemptId>,
}

/// Outcome of [`AttemptLog::claim_freshest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// The record to run next.
    pub chosen: AttemptId,
    /// Waiting records dropped in favour of `chosen`, in log order.
    pub superseded: Vec<AttemptId>,
}

/// Point-in-time copy of the whole log, taken under the log lock.
#[derive(Debug, Clone, Serialize)]
pub struct LogSnapshot {
    pub in_flight: Option<AttemptId>,
    pub records: Vec<AttemptRecord>,
}

/// Append-only, ordered history of attempts.
///
/// Cheap to clone; all clones share the same records.
#[derive(Clone, Default)]
pub struct AttemptLog {
    inner: Arc<Mutex<LogInner>>,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        // Records stay consistent field-by-field, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a pending record for `event`.
    pub fn append(&self, event: NotificationEvent) -> AttemptId {
        self.append_with(event, |_| {})
    }

    /// Append a pending record and run `then` on it before releasing the lock.
    ///
    /// Producers use this to hand the record off in the same critical
    /// section, so hand-off order always matches log order.
    pub fn append_with(
        &self,
        event: NotificationEvent,
        then: impl FnOnce(&AttemptRecord),
    ) -> AttemptId {
        let mut inner = self.lock();
        let id = AttemptId(inner.records.len() as u64);
        inner.records.push(AttemptRecord::new(id, event));
        then(&inner.records[inner.records.len() - 1]);
        debug!(attempt = %id, "notification recorded");
        id
    }

    /// Run `f` against one record under the log lock.
    pub fn with_attempt<R>(
        &self,
        id: AttemptId,
        f: impl FnOnce(&mut AttemptRecord) -> R,
    ) -> Option<R> {
        let mut inner = self.lock();
        inner.records.get_mut(id.0 as usize).map(f)
    }

    /// Consistent copy of every record for status rendering.
    pub fn snapshot(&self) -> LogSnapshot {
        let inner = self.lock();
        LogSnapshot {
            in_flight: inner.in_flight,
            records: inner.records.clone(),
        }
    }

    pub fn get(&self, id: AttemptId) -> Option<AttemptRecord> {
        self.lock().records.get(id.0 as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> Option<AttemptId> {
        self.lock().in_flight
    }

    /// Mark `id` as started.
    ///
    /// Returns `false` without touching anything if another attempt is in
    /// flight, or if `id` is unknown or was already attempted.
    pub fn begin(&self, id: AttemptId) -> bool {
        let mut inner = self.lock();
        if let Some(running) = inner.in_flight {
            warn!(attempt = %id, %running, "refusing to start while another attempt is in flight");
            return false;
        }
        let Some(record) = inner.records.get_mut(id.0 as usize) else {
            return false;
        };
        if record.attempted {
            return false;
        }
        record.attempted = true;
        record.started_at = Some(Utc::now());
        inner.in_flight = Some(id);
        true
    }

    /// Pick the freshest waiting record and drop every other waiting one
    /// in its favour.
    ///
    /// Waiting means neither attempted nor already superseded. Freshness is
    /// `(received_at, id)`, so equal timestamps go to the later arrival.
    /// Records that already ran never take part, whatever their timestamps.
    pub fn claim_freshest(&self) -> Option<Claim> {
        let mut inner = self.lock();
        let chosen = inner
            .records
            .iter()
            .filter(|r| r.is_waiting())
            .max_by_key(|r| (r.event.received_at, r.id))?
            .id;

        let mut superseded = Vec::new();
        for record in inner.records.iter_mut() {
            if record.id != chosen && record.is_waiting() {
                record.superseded_by = Some(chosen);
                superseded.push(record.id);
            }
        }
        Some(Claim { chosen, superseded })
    }

    pub fn record_update_id(&self, id: AttemptId, update_id: &str) {
        self.with_attempt(id, |record| record.update_id = Some(update_id.to_string()));
    }

    pub fn push_status(&self, id: AttemptId, line: &str) {
        self.with_attempt(id, |record| record.status_log.push(line.to_string()));
    }

    /// Publish the terminal outcome of `id` and release the in-flight slot.
    pub fn finish(&self, id: AttemptId, outcome: Result<(), AttemptFailure>) {
        let mut inner = self.lock();
        if let Some(record) = inner.records.get_mut(id.0 as usize) {
            record.ended_at = Some(Utc::now());
            match outcome {
                Ok(()) => {
                    record.succeeded = true;
                    record.error = None;
                }
                Err(failure) => {
                    record.succeeded = false;
                    record.error = Some(failure);
                }
            }
        }
        if inner.in_flight == Some(id) {
            inner.in_flight = None;
        }
    }
}
