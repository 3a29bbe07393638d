//! rollhook-kube — Kubernetes orchestration backend.
//!
//! Implements [`rollhook_rollout::Orchestrator`] over `ReplicationController`
//! objects. Readiness comes from `status.readyReplicas`.

mod convert;
mod orchestrator;

pub use convert::{from_k8s, to_k8s};
pub use orchestrator::{KubeOrchestrator, KubeSetupError};
