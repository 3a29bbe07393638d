//! Per-attempt replacement plan.

use crate::controller::ReplicaController;
use crate::executor::ReplaceConfig;
use crate::strategy::{CleanupPolicy, RolloutTiming};

/// Stable label naming the workload a controller belongs to.
pub const RUN_LABEL: &str = "run";

/// Everything one rolling replacement needs, derived from the live controller.
#[derive(Debug, Clone)]
pub struct ReplacementPlan {
    /// Snapshot of the controller being replaced.
    pub old: ReplicaController,
    /// Definition of the controller to create.
    pub new: ReplicaController,
    /// Content hash of `old`; also the discriminator label value on `new`.
    pub update_id: String,
    /// Replica count `new` must reach.
    pub desired_replicas: u32,
    pub timing: RolloutTiming,
    pub cleanup: CleanupPolicy,
}

impl ReplacementPlan {
    /// Build a plan from two reads of the live controller.
    ///
    /// `working` becomes the new controller: renamed to
    /// `<controller>-<update_id>`, revision stamp cleared, scaled to zero,
    /// and labelled so its pods are distinguishable from the old ones.
    pub fn derive(
        old: ReplicaController,
        working: ReplicaController,
        update_id: String,
        config: &ReplaceConfig,
    ) -> Self {
        let mut new = working;
        new.name = format!("{}-{}", config.controller_name, update_id);
        new.resource_version = None;
        new.replicas = 0;
        for labels in [&mut new.selector, &mut new.template_labels] {
            labels.insert(config.deployment_key.clone(), update_id.clone());
            labels.insert(RUN_LABEL.to_string(), config.controller_name.clone());
        }

        Self {
            desired_replicas: old.replicas,
            old,
            new,
            update_id,
            timing: config.timing.clone(),
            cleanup: config.cleanup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReplaceConfig {
        ReplaceConfig::new("prod", "web", "deployment")
    }

    fn live() -> ReplicaController {
        let mut rc = ReplicaController::new("web", 3);
        rc.resource_version = Some("42".to_string());
        rc.selector.insert("app".to_string(), "web".to_string());
        rc.template_labels.insert("app".to_string(), "web".to_string());
        rc
    }

    #[test]
    fn new_controller_is_named_after_hash() {
        let plan = ReplacementPlan::derive(live(), live(), "0a1b2c".to_string(), &config());
        assert_eq!(plan.new.name, "web-0a1b2c");
        assert_eq!(plan.new.resource_version, None);
        assert_eq!(plan.new.replicas, 0);
        assert_eq!(plan.desired_replicas, 3);
    }

    #[test]
    fn discriminator_applied_to_selector_and_template() {
        let plan = ReplacementPlan::derive(live(), live(), "0a1b2c".to_string(), &config());
        for labels in [&plan.new.selector, &plan.new.template_labels] {
            assert_eq!(labels["deployment"], "0a1b2c");
            assert_eq!(labels[RUN_LABEL], "web");
            assert_eq!(labels["app"], "web");
        }
    }

    #[test]
    fn old_snapshot_is_untouched() {
        let plan = ReplacementPlan::derive(live(), live(), "0a1b2c".to_string(), &config());
        assert_eq!(plan.old, live());
        assert!(!plan.old.selector.contains_key("deployment"));
    }
}
