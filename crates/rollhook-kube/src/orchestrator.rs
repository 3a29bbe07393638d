//! [`Orchestrator`] over the Kubernetes API.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ReplicationController;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, Config};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use rollhook_rollout::{Orchestrator, OrchestratorError, OrchestratorResult, ReplicaController};

use crate::convert::{clamp_count, from_k8s, replica_count, to_k8s};

/// Failure to build a cluster client.
#[derive(Debug, Error)]
pub enum KubeSetupError {
    #[error("invalid cluster endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("kubernetes client error: {0}")]
    Client(#[from] kube::Error),
}

/// Kubernetes-backed [`Orchestrator`].
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
}

impl KubeOrchestrator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Use in-cluster configuration, falling back to the local kubeconfig.
    pub async fn try_default() -> Result<Self, KubeSetupError> {
        let client = Client::try_default().await?;
        info!("using inferred kubernetes configuration");
        Ok(Self::new(client))
    }

    /// Talk to the API server at `endpoint` without authentication.
    pub fn from_endpoint(endpoint: &str) -> Result<Self, KubeSetupError> {
        let uri: http::Uri = endpoint.parse().map_err(|e: http::uri::InvalidUri| {
            KubeSetupError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })?;
        let client = Client::try_from(Config::new(uri))?;
        info!(%endpoint, "using explicit kubernetes endpoint");
        Ok(Self::new(client))
    }

    fn api(&self, namespace: &str) -> Api<ReplicationController> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn map_err(namespace: &str, name: &str, err: kube::Error) -> OrchestratorError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => {
            OrchestratorError::NotFound(format!("{namespace}/{name}"))
        }
        kube::Error::Api(resp) if resp.code == 409 => {
            OrchestratorError::AlreadyExists(format!("{namespace}/{name}"))
        }
        other => OrchestratorError::Api(other.to_string()),
    }
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn get(&self, namespace: &str, name: &str) -> OrchestratorResult<ReplicaController> {
        let rc = self
            .api(namespace)
            .get(name)
            .await
            .map_err(|e| map_err(namespace, name, e))?;
        from_k8s(&rc)
    }

    async fn create(
        &self,
        namespace: &str,
        controller: &ReplicaController,
    ) -> OrchestratorResult<ReplicaController> {
        let obj = to_k8s(controller)?;
        let created = self
            .api(namespace)
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| map_err(namespace, &controller.name, e))?;
        debug!(namespace, name = %controller.name, "created replication controller");
        from_k8s(&created)
    }

    async fn update(
        &self,
        namespace: &str,
        controller: &ReplicaController,
    ) -> OrchestratorResult<ReplicaController> {
        let api = self.api(namespace);
        let name = controller.name.as_str();
        let mut current = api.get(name).await.map_err(|e| map_err(namespace, name, e))?;

        let desired = to_k8s(controller)?;
        current.metadata.labels = desired.metadata.labels;
        let spec = current.spec.get_or_insert_with(Default::default);
        if let Some(want) = desired.spec {
            spec.replicas = want.replicas;
            spec.selector = want.selector;
            let template_labels = want.template.and_then(|t| t.metadata).and_then(|m| m.labels);
            spec.template
                .get_or_insert_with(Default::default)
                .metadata
                .get_or_insert_with(Default::default)
                .labels = template_labels;
        }

        let replaced = api
            .replace(name, &PostParams::default(), &current)
            .await
            .map_err(|e| map_err(namespace, name, e))?;
        debug!(namespace, name, "updated replication controller");
        from_k8s(&replaced)
    }

    async fn scale(&self, namespace: &str, name: &str, replicas: u32) -> OrchestratorResult<()> {
        let patch = Patch::Merge(json!({"spec": {"replicas": replica_count(replicas)?}}));
        self.api(namespace)
            .patch(name, &PatchParams::default(), &patch)
            .await
            .map_err(|e| map_err(namespace, name, e))?;
        debug!(namespace, name, replicas, "scaled replication controller");
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> OrchestratorResult<()> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| map_err(namespace, name, e))?;
        debug!(namespace, name, "deleted replication controller");
        Ok(())
    }

    /// Pods of the renamed controller must survive the delete, so the
    /// original is removed with orphan propagation and the copy adopts
    /// them through the unchanged selector.
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

        let name = controller.name.as_str();
        self.api(namespace)
            .delete(name, &DeleteParams::orphan())
            .await
            .map_err(|e| map_err(namespace, name, e))?;
        debug!(namespace, from = name, to = new_name, "renamed replication controller");
        Ok(created)
    }

    async fn ready_replicas(&self, namespace: &str, name: &str) -> OrchestratorResult<u32> {
        let rc = self
            .api(namespace)
            .get_status(name)
            .await
            .map_err(|e| map_err(namespace, name, e))?;
        Ok(rc
            .status
            .and_then(|s| s.ready_replicas)
            .map(clamp_count)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "Test".to_string(),
            code,
        })
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert_eq!(
            map_err("default", "web", api_error(404)),
            OrchestratorError::NotFound("default/web".to_string())
        );
        assert_eq!(
            map_err("default", "web", api_error(409)),
            OrchestratorError::AlreadyExists("default/web".to_string())
        );
        assert!(matches!(
            map_err("default", "web", api_error(500)),
            OrchestratorError::Api(_)
        ));
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        let err = KubeOrchestrator::from_endpoint("http://bad host:8080").err().unwrap();
        assert!(matches!(err, KubeSetupError::InvalidEndpoint { .. }));
    }
}
