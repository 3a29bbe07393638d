//! The update worker: the only place replacements run.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use rollhook_rollout::{AttemptReporter, Replacement};
use rollhook_state::{AttemptFailure, AttemptId, AttemptLog};

use crate::coordinator::PendingQueue;

/// Publishes executor progress into one attempt record.
pub struct RecordReporter {
    log: AttemptLog,
    id: AttemptId,
}

impl RecordReporter {
    pub fn new(log: AttemptLog, id: AttemptId) -> Self {
        Self { log, id }
    }
}

impl AttemptReporter for RecordReporter {
    fn update_id(&self, update_id: &str) {
        self.log.record_update_id(self.id, update_id);
    }

    fn progress(&self, line: &str) {
        self.log.push_status(self.id, line);
    }
}

/// Single-flight consumer of the pending queue.
pub struct Worker {
    log: AttemptLog,
    replacement: Arc<dyn Replacement>,
}

impl Worker {
    pub fn new(log: AttemptLog, replacement: Arc<dyn Replacement>) -> Self {
        Self { log, replacement }
    }

    /// Process notifications until shutdown or until every producer is gone.
    ///
    /// Each wake-up claims the freshest waiting record from the log. Waiting
    /// records that lose are marked superseded and never run.
    pub async fn run(self, mut queue: PendingQueue, mut shutdown: watch::Receiver<bool>) {
        info!("update worker started");
        loop {
            tokio::select! {
                changed = queue.changed() => if changed.is_err() {
                    break;
                },
                _ = shutdown.changed() => break,
            }
            queue.mark_unchanged();

            let Some(claim) = self.log.claim_freshest() else {
                continue;
            };
            for stale in &claim.superseded {
                debug!(attempt = %stale, by = %claim.chosen, "notification superseded");
            }
            self.execute(claim.chosen).await;
        }
        info!("update worker stopped");
    }

    /// Run one attempt to completion and publish its outcome.
    pub async fn execute(&self, id: AttemptId) {
        if !self.log.begin(id) {
            warn!(attempt = %id, "attempt could not start");
            return;
        }
        info!(attempt = %id, "update started");

        let reporter = RecordReporter::new(self.log.clone(), id);
        let outcome = self.replacement.replace(&reporter).await;

        match &outcome {
            Ok(()) => info!(attempt = %id, "update succeeded"),
            Err(e) => error!(attempt = %id, kind = %e.kind(), error = %e, "update failed"),
        }
        self.log
            .finish(id, outcome.as_ref().map(|_| ()).map_err(AttemptFailure::from));
    }
}
