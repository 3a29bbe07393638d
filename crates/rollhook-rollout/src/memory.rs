//! In-process orchestration backend.
//!
//! Holds controllers in a map and reports every replica as ready unless
//! told otherwise. Used by tests across the workspace and by the daemon's
//! dry-run mode.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::backend::Orchestrator;
use crate::controller::ReplicaController;
use crate::error::{OrchestratorError, OrchestratorResult};

struct MemoryInner {
    controllers: BTreeMap<(String, String), ReplicaController>,
    ready: bool,
    fail_reads: bool,
    next_version: u64,
    journal: Vec<String>,
}

/// [`Orchestrator`] backed by an in-memory map.
pub struct MemoryOrchestrator {
    inner: Mutex<MemoryInner>,
}

impl Default for MemoryOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrchestrator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                controllers: BTreeMap::new(),
                ready: true,
                fail_reads: false,
                next_version: 1,
                journal: Vec::new(),
            }),
        }
    }

    pub fn with_controller(self, namespace: &str, controller: ReplicaController) -> Self {
        self.insert(namespace, controller);
        self
    }

    /// Store a controller, overwriting any existing one with the same name.
    pub fn insert(&self, namespace: &str, mut controller: ReplicaController) {
        let mut inner = self.lock();
        controller.resource_version = Some(inner.bump());
        inner
            .controllers
            .insert((namespace.to_string(), controller.name.clone()), controller);
    }

    /// Whether replicas report ready. Defaults to `true`.
    pub fn set_ready(&self, ready: bool) {
        self.lock().ready = ready;
    }

    /// Make every `get` fail with an API error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Names of the controllers in `namespace`, sorted.
    pub fn names(&self, namespace: &str) -> Vec<String> {
        self.lock()
            .controllers
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Mutating operations in the order they were applied.
    pub fn journal(&self) -> Vec<String> {
        self.lock().journal.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryInner {
    fn bump(&mut self) -> String {
        let version = self.next_version;
        self.next_version += 1;
        version.to_string()
    }

    fn get_mut(
        &mut self,
        namespace: &str,
        name: &str,
    ) -> OrchestratorResult<&mut ReplicaController> {
        self.controllers
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| OrchestratorError::NotFound(format!("{namespace}/{name}")))
    }

    fn record(&mut self, entry: String) {
        debug!(op = %entry, "memory orchestrator");
        self.journal.push(entry);
    }
}

#[async_trait]
impl Orchestrator for MemoryOrchestrator {
    async fn get(&self, namespace: &str, name: &str) -> OrchestratorResult<ReplicaController> {
        let mut inner = self.lock();
        if inner.fail_reads {
            return Err(OrchestratorError::Api(format!("read of {namespace}/{name} refused")));
        }
        inner.get_mut(namespace, name).cloned()
    }

    async fn create(
        &self,
        namespace: &str,
        controller: &ReplicaController,
    ) -> OrchestratorResult<ReplicaController> {
        let mut inner = self.lock();
        let key = (namespace.to_string(), controller.name.clone());
        if inner.controllers.contains_key(&key) {
            return Err(OrchestratorError::AlreadyExists(format!(
                "{namespace}/{}",
                controller.name
            )));
        }
        let mut created = controller.clone();
        created.resource_version = Some(inner.bump());
        inner.controllers.insert(key, created.clone());
        inner.record(format!("create {} replicas={}", created.name, created.replicas));
        Ok(created)
    }

    async fn update(
        &self,
        namespace: &str,
        controller: &ReplicaController,
    ) -> OrchestratorResult<ReplicaController> {
        let mut inner = self.lock();
        let version = inner.bump();
        let existing = inner.get_mut(namespace, &controller.name)?;
        existing.labels = controller.labels.clone();
        existing.selector = controller.selector.clone();
        existing.template_labels = controller.template_labels.clone();
        existing.replicas = controller.replicas;
        existing.resource_version = Some(version);
        let updated = existing.clone();
        inner.record(format!("update {}", updated.name));
        Ok(updated)
    }

    async fn scale(&self, namespace: &str, name: &str, replicas: u32) -> OrchestratorResult<()> {
        let mut inner = self.lock();
        let version = inner.bump();
        let existing = inner.get_mut(namespace, name)?;
        existing.replicas = replicas;
        existing.resource_version = Some(version);
        inner.record(format!("scale {name} {replicas}"));
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> OrchestratorResult<()> {
        let mut inner = self.lock();
        inner
            .controllers
            .remove(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| OrchestratorError::NotFound(format!("{namespace}/{name}")))?;
        inner.record(format!("delete {name}"));
        Ok(())
    }

    async fn ready_replicas(&self, namespace: &str, name: &str) -> OrchestratorResult<u32> {
        let mut inner = self.lock();
        let ready = inner.ready;
        let rc = inner.get_mut(namespace, name)?;
        Ok(if ready { rc.replicas } else { 0 })
    }
}
