//! The orchestration collaborator.
//!
//! The executor never talks to a cluster directly. Everything it needs is
//! expressed by [`Orchestrator`], and how fast a roll may advance is
//! decided by an [`UpdateAcceptor`].

use async_trait::async_trait;

use crate::controller::{ReplicaController, content_hash};
use crate::error::OrchestratorResult;

/// Capabilities a cluster backend provides to the rollout.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Read a controller by name.
    async fn get(&self, namespace: &str, name: &str) -> OrchestratorResult<ReplicaController>;

    /// Create a controller. `resource_version` must be unset.
    async fn create(
        &self,
        namespace: &str,
        controller: &ReplicaController,
    ) -> OrchestratorResult<ReplicaController>;

    /// Replace labels, selector and replica count of an existing controller.
    async fn update(
        &self,
        namespace: &str,
        controller: &ReplicaController,
    ) -> OrchestratorResult<ReplicaController>;

    /// Set the desired replica count of a controller.
    async fn scale(&self, namespace: &str, name: &str, replicas: u32) -> OrchestratorResult<()>;

    async fn delete(&self, namespace: &str, name: &str) -> OrchestratorResult<()>;

    /// Number of replicas of a controller that currently pass readiness.
    async fn ready_replicas(&self, namespace: &str, name: &str) -> OrchestratorResult<u32>;

    /// Move a controller to a new name.
    ///
    /// The default creates a copy under `new_name`, then deletes the original.
    async fn rename(
        &self,
        namespace: &str,
        controller: &ReplicaController,
        new_name: &str,
    ) -> OrchestratorResult<ReplicaController> {
        let mut renamed = controller.clone();
        renamed.name = new_name.to_string();
        renamed.resource_version = None;
        let created = self.create(namespace, &renamed).await?;
        self.delete(namespace, &controller.name).await?;
        Ok(created)
    }

    /// Identity of a controller revision.
    fn content_hash(&self, controller: &ReplicaController) -> String {
        content_hash(controller)
    }
}

/// Decides whether a scaled-up controller is healthy enough to continue.
#[async_trait]
pub trait UpdateAcceptor: Send + Sync {
    async fn accept(
        &self,
        orchestrator: &dyn Orchestrator,
        namespace: &str,
        controller: &str,
        desired: u32,
    ) -> OrchestratorResult<bool>;
}

/// Accepts once every desired replica of the new controller is ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadinessAcceptor;

#[async_trait]
impl UpdateAcceptor for ReadinessAcceptor {
    async fn accept(
        &self,
        orchestrator: &dyn Orchestrator,
        namespace: &str,
        controller: &str,
        desired: u32,
    ) -> OrchestratorResult<bool> {
        let ready = orchestrator.ready_replicas(namespace, controller).await?;
        Ok(ready >= desired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryOrchestrator;

    #[tokio::test]
    async fn readiness_acceptor_follows_ready_replicas() {
        let orch =
            MemoryOrchestrator::new().with_controller("default", ReplicaController::new("web", 2));

        assert!(ReadinessAcceptor.accept(&orch, "default", "web", 2).await.unwrap());

        orch.set_ready(false);
        assert!(!ReadinessAcceptor.accept(&orch, "default", "web", 1).await.unwrap());
        assert!(ReadinessAcceptor.accept(&orch, "default", "web", 0).await.unwrap());
    }

    #[tokio::test]
    async fn default_rename_moves_controller() {
        let orch = MemoryOrchestrator::new()
            .with_controller("default", ReplicaController::new("web-abc", 3));
        let current = orch.get("default", "web-abc").await.unwrap();

        let renamed = orch.rename("default", &current, "web").await.unwrap();
        assert_eq!(renamed.name, "web");
        assert_eq!(renamed.replicas, 3);
        assert!(orch.get("default", "web-abc").await.is_err());
        assert!(orch.get("default", "web").await.is_ok());
    }
}
