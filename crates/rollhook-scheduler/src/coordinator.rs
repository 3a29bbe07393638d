//! Coordinator: the shared context producers and readers go through.

use tokio::sync::watch;
use tracing::{info, warn};

use rollhook_state::{AttemptId, AttemptLog, NotificationEvent};
use rollhook_webhook::WebhookPayload;

/// Worker side of the hand-off. The value is the most recently appended
/// attempt. It only signals that work may be waiting, and the log decides
/// which record runs next.
pub type PendingQueue = watch::Receiver<Option<AttemptId>>;

/// Entry point for notifications and status reads.
#[derive(Clone)]
pub struct Coordinator {
    log: AttemptLog,
    wake: watch::Sender<Option<AttemptId>>,
}

impl Coordinator {
    /// Create a coordinator with an empty log, plus the queue its worker reads.
    pub fn new() -> (Self, PendingQueue) {
        Self::with_log(AttemptLog::new())
    }

    pub fn with_log(log: AttemptLog) -> (Self, PendingQueue) {
        let (wake, rx) = watch::channel(None);
        (Self { log, wake }, rx)
    }

    pub fn log(&self) -> &AttemptLog {
        &self.log
    }

    /// Record a notification received now from `source` and wake the worker.
    pub fn enqueue(&self, payload: WebhookPayload, source: &str) -> AttemptId {
        self.submit(NotificationEvent::new(payload, source))
    }

    /// Record `event` and wake the worker. Never blocks on the worker.
    ///
    /// The record is in the log before this returns, and the wake-up is
    /// sent inside the same critical section as the append.
    pub fn submit(&self, event: NotificationEvent) -> AttemptId {
        let id = self.log.append_with(event, |record| {
            self.wake.send_replace(Some(record.id));
            if self.wake.is_closed() {
                warn!(attempt = %record.id, "update worker is gone; notification stays pending");
            }
        });
        info!(attempt = %id, "notification queued");
        id
    }
}
