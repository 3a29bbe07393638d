//! Replacement executor: drives one rolling replacement to completion.
//!
//! Phases, in order:
//!
//! 1. **Fetch**: read the live controller (old snapshot + working copy)
//! 2. **Derive**: hash the snapshot, publish the update id, build the plan
//! 3. **Roll**: scale new up / old down in lock-step, gated by the acceptor
//! 4. **Cleanup**: delete the old controller, rename the new one
//!
//! A failure at any phase ends the attempt. Nothing is rolled back.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{Instant, sleep, sleep_until, timeout_at};
use tracing::{debug, info, warn};

use crate::backend::{Orchestrator, ReadinessAcceptor, UpdateAcceptor};
use crate::controller::ReplicaController;
use crate::error::{OrchestratorError, ReplaceError, ReplaceResult};
use crate::plan::ReplacementPlan;
use crate::strategy::{CleanupPolicy, RolloutTiming};

/// Sink for what an attempt is doing while it runs.
pub trait AttemptReporter: Send + Sync {
    /// Called once, before the roll starts.
    fn update_id(&self, update_id: &str);
    /// One human-readable progress line.
    fn progress(&self, line: &str);
}

/// Something the scheduler can run once per coalesced notification.
#[async_trait]
pub trait Replacement: Send + Sync {
    async fn replace(&self, reporter: &dyn AttemptReporter) -> ReplaceResult<()>;
}

/// Which controller to replace, and how.
#[derive(Debug, Clone)]
pub struct ReplaceConfig {
    pub namespace: String,
    pub controller_name: String,
    /// Label key carrying the discriminator (content hash).
    pub deployment_key: String,
    pub timing: RolloutTiming,
    pub cleanup: CleanupPolicy,
}

impl ReplaceConfig {
    pub fn new(namespace: &str, controller_name: &str, deployment_key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            controller_name: controller_name.to_string(),
            deployment_key: deployment_key.to_string(),
            timing: RolloutTiming::default(),
            cleanup: CleanupPolicy::default(),
        }
    }

    pub fn with_timing(mut self, timing: RolloutTiming) -> Self {
        self.timing = timing;
        self
    }
}

/// Rolls a controller over to a fresh copy of itself.
pub struct ReplacementExecutor {
    orchestrator: Arc<dyn Orchestrator>,
    acceptor: Arc<dyn UpdateAcceptor>,
    config: ReplaceConfig,
}

impl ReplacementExecutor {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, config: ReplaceConfig) -> Self {
        Self {
            orchestrator,
            acceptor: Arc::new(ReadinessAcceptor),
            config,
        }
    }

    /// Replace the default readiness predicate.
    pub fn with_acceptor(mut self, acceptor: Arc<dyn UpdateAcceptor>) -> Self {
        self.acceptor = acceptor;
        self
    }

    pub fn config(&self) -> &ReplaceConfig {
        &self.config
    }

    async fn fetch(&self) -> ReplaceResult<(ReplicaController, ReplicaController)> {
        let name = &self.config.controller_name;
        let fetch_err = |source: OrchestratorError| ReplaceError::Fetch {
            name: name.clone(),
            source,
        };
        let old = self
            .orchestrator
            .get(&self.config.namespace, name)
            .await
            .map_err(fetch_err)?;
        let working = self
            .orchestrator
            .get(&self.config.namespace, name)
            .await
            .map_err(fetch_err)?;
        Ok((old, working))
    }

    async fn roll(
        &self,
        plan: &ReplacementPlan,
        reporter: &dyn AttemptReporter,
    ) -> ReplaceResult<()> {
        let ns = self.config.namespace.as_str();
        let old_name = plan.old.name.as_str();
        let new_name = plan.new.name.as_str();
        let desired = plan.desired_replicas;
        let deadline = Instant::now() + plan.timing.timeout;
        let bound = Bound {
            plan,
            deadline,
            reporter,
        };

        let lookup = bound
            .run(self, new_name, self.orchestrator.get(ns, new_name))
            .await?;
        let mut new_count = match lookup {
            Ok(existing) => {
                report(reporter, format!("Continuing update with existing controller {new_name}."));
                if existing.selector != plan.new.selector
                    || existing.template_labels != plan.new.template_labels
                {
                    let mut converged = existing.clone();
                    converged.selector = plan.new.selector.clone();
                    converged.template_labels = plan.new.template_labels.clone();
                    bound
                        .run(self, new_name, self.orchestrator.update(ns, &converged))
                        .await??;
                }
                existing.replicas
            }
            Err(OrchestratorError::NotFound(_)) => {
                let created = bound
                    .run(self, new_name, self.orchestrator.create(ns, &plan.new))
                    .await??;
                report(reporter, format!("Created {new_name}"));
                created.replicas
            }
            Err(e) => return Err(e.into()),
        };
        let mut old_count = plan.old.replicas;

        report(
            reporter,
            format!(
                "Scaling up {new_name} from {new_count} to {desired}, \
                 scaling down {old_name} from {old_count} to 0 \
                 (keep {desired} pods available, don't exceed {} pods)",
                desired + 1
            ),
        );

        while new_count < desired || old_count > 0 {
            if Instant::now() >= deadline {
                return Err(self.timed_out(plan, new_name, reporter));
            }

            if new_count < desired {
                new_count += 1;
                bound
                    .run(self, new_name, self.orchestrator.scale(ns, new_name, new_count))
                    .await??;
                report(reporter, format!("Scaling {new_name} up to {new_count}"));
            }

            self.await_acceptance(&bound, new_name, new_count).await?;

            // Only retire what the new controller now covers.
            let excess = (old_count + new_count).saturating_sub(desired).min(old_count);
            if excess > 0 {
                old_count -= excess;
                bound
                    .run(self, old_name, self.orchestrator.scale(ns, old_name, old_count))
                    .await??;
                report(reporter, format!("Scaling {old_name} down to {old_count}"));
            }

            if new_count < desired || old_count > 0 {
                let pause = deadline.min(Instant::now() + plan.timing.update_period);
                sleep_until(pause).await;
            }
        }

        Ok(())
    }

    async fn await_acceptance(
        &self,
        bound: &Bound<'_>,
        controller: &str,
        desired: u32,
    ) -> ReplaceResult<()> {
        let ns = self.config.namespace.as_str();
        let mut announced = false;
        loop {
            let check = self
                .acceptor
                .accept(&*self.orchestrator, ns, controller, desired);
            if bound.run(self, controller, check).await?? {
                return Ok(());
            }

            let now = Instant::now();
            if now >= bound.deadline {
                return Err(self.timed_out(bound.plan, controller, bound.reporter));
            }
            if !announced {
                let line = format!("Waiting for {controller} to have {desired} ready replicas");
                report(bound.reporter, line);
                announced = true;
            }
            sleep(bound.plan.timing.interval.min(bound.deadline - now)).await;
        }
    }

    fn timed_out(
        &self,
        plan: &ReplacementPlan,
        controller: &str,
        reporter: &dyn AttemptReporter,
    ) -> ReplaceError {
        let err = ReplaceError::RolloutTimeout {
            controller: controller.to_string(),
            desired: plan.desired_replicas,
            timeout: plan.timing.timeout,
        };
        warn!(controller = %controller, error = %err, "rollout deadline exceeded");
        reporter.progress(&format!("Giving up: {err}"));
        err
    }

    async fn cleanup(
        &self,
        plan: &ReplacementPlan,
        reporter: &dyn AttemptReporter,
    ) -> ReplaceResult<()> {
        let ns = self.config.namespace.as_str();
        match plan.cleanup {
            CleanupPolicy::Rename => {
                report(reporter, format!("Update succeeded. Deleting {}", plan.old.name));
                self.orchestrator.delete(ns, &plan.old.name).await?;

                let current = self.orchestrator.get(ns, &plan.new.name).await?;
                report(reporter, format!("Renaming {} to {}", plan.new.name, plan.old.name));
                self.orchestrator.rename(ns, &current, &plan.old.name).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Replacement for ReplacementExecutor {
    async fn replace(&self, reporter: &dyn AttemptReporter) -> ReplaceResult<()> {
        let (old, working) = self.fetch().await?;

        let update_id = self.orchestrator.content_hash(&old);
        reporter.update_id(&update_id);
        let plan = ReplacementPlan::derive(old, working, update_id, &self.config);
        debug!(
            controller = %plan.old.name,
            target = %plan.new.name,
            desired = plan.desired_replicas,
            "replacement planned"
        );

        self.roll(&plan, reporter).await?;
        self.cleanup(&plan, reporter).await?;

        info!(controller = %plan.old.name, update_id = %plan.update_id, "replacement complete");
        Ok(())
    }
}

/// The rollout deadline, shared by every call made while rolling.
struct Bound<'a> {
    plan: &'a ReplacementPlan,
    deadline: Instant,
    reporter: &'a dyn AttemptReporter,
}

impl Bound<'_> {
    /// Await `call`, giving up with a rollout timeout once the deadline passes.
    async fn run<T>(
        &self,
        executor: &ReplacementExecutor,
        controller: &str,
        call: impl Future<Output = T>,
    ) -> ReplaceResult<T> {
        timeout_at(self.deadline, call)
            .await
            .map_err(|_| executor.timed_out(self.plan, controller, self.reporter))
    }
}

fn report(reporter: &dyn AttemptReporter, line: String) {
    info!(progress = %line, "rollout");
    reporter.progress(&line);
}
