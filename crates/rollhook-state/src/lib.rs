//! rollhook-state — in-memory record of every update attempt.
//!
//! Each accepted push notification becomes an [`AttemptRecord`] appended to
//! the [`AttemptLog`]. The scheduler marks the record it runs, the executor
//! streams progress into it, and the status views read consistent
//! snapshots of the whole log.
//!
//! # Architecture
//!
//! The log is a `Clone` handle over `Arc<Mutex<..>>`. One lock guards the
//! record list and the in-flight pointer. Critical sections are short and
//! never span an `.await`, so readers are not starved by a running update.
//!
//! Records are never removed. History lives for the process lifetime.

pub mod log;
pub mod types;

pub use log::{AttemptLog, Claim, LogSnapshot};
pub use types::*;
