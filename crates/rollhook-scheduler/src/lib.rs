//! rollhook-scheduler — coalescing, single-flight update scheduling.
//!
//! Producers hand notifications to a [`Coordinator`], which records them in
//! the attempt log and wakes the worker. The [`Worker`] runs one replacement
//! at a time. When it frees up it claims the freshest waiting record from
//! the log. The other waiting records stay in the log, marked as superseded.
//! Records that already ran never count, so a late notification with an old
//! timestamp still runs if nothing fresher is waiting.
//!
//! # Architecture
//!
//! ```text
//! intake ──enqueue──▶ Coordinator ──append──▶ AttemptLog ◀──snapshot── status
//!                          │                      ▲
//!                       wake-up                   │ claim / begin / progress / finish
//!                          ▼                      │
//!                        Worker ──replace──▶ Replacement (executor)
//! ```
//!
//! Producers never wait on the worker. The worker never holds the log lock
//! across an orchestration call.

pub mod coordinator;
pub mod worker;

pub use coordinator::{Coordinator, PendingQueue};
pub use worker::{RecordReporter, Worker};
