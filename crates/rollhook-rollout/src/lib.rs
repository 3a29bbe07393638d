//! rollhook-rollout — rolling replacement of a replicated controller.
//!
//! Given the name of a live controller, the executor derives a content hash
//! of its definition, creates a sibling controller named
//! `<controller>-<hash>` carrying that hash as a discriminator label, and
//! moves replicas across one at a time until the old controller is empty.
//! The new controller then takes over the canonical name.
//!
//! # Components
//!
//! - **`controller`**: backend-neutral controller definition and content hash
//! - **`backend`**: the [`Orchestrator`] collaborator trait and acceptance predicates
//! - **`memory`**: in-process [`Orchestrator`] for tests and dry runs
//! - **`strategy`**: rollout timing and cleanup policy
//! - **`plan`**: per-attempt [`ReplacementPlan`]
//! - **`executor`**: the [`ReplacementExecutor`] state machine

pub mod backend;
pub mod controller;
pub mod error;
pub mod executor;
pub mod memory;
pub mod plan;
pub mod strategy;

pub use backend::{Orchestrator, ReadinessAcceptor, UpdateAcceptor};
pub use controller::{ReplicaController, content_hash};
pub use error::{OrchestratorError, OrchestratorResult, ReplaceError, ReplaceResult};
pub use executor::{AttemptReporter, ReplaceConfig, Replacement, ReplacementExecutor};
pub use memory::MemoryOrchestrator;
pub use plan::{RUN_LABEL, ReplacementPlan};
pub use strategy::{CleanupPolicy, RolloutTiming};
