//! Mapping between cluster objects and [`ReplicaController`].
//!
//! The pod template is carried as JSON with its labels lifted out into
//! `template_labels`, so the rollout can edit them without knowing the
//! rest of the pod spec.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{PodTemplateSpec, ReplicationController, ReplicationControllerSpec};
use kube::api::ObjectMeta;
use serde_json::Value;

use rollhook_rollout::{OrchestratorError, OrchestratorResult, ReplicaController};

pub fn from_k8s(rc: &ReplicationController) -> OrchestratorResult<ReplicaController> {
    let spec = rc.spec.clone().unwrap_or_default();
    let mut template = spec.template.unwrap_or_default();
    let template_labels = template
        .metadata
        .as_mut()
        .and_then(|meta| meta.labels.take())
        .unwrap_or_default();

    let template = if template == PodTemplateSpec::default() {
        Value::Null
    } else {
        serde_json::to_value(&template).map_err(|e| OrchestratorError::Codec(e.to_string()))?
    };

    Ok(ReplicaController {
        name: rc.metadata.name.clone().unwrap_or_default(),
        resource_version: rc.metadata.resource_version.clone(),
        replicas: spec.replicas.map(clamp_count).unwrap_or(1),
        labels: rc.metadata.labels.clone().unwrap_or_default(),
        selector: spec.selector.unwrap_or_default(),
        template_labels,
        template,
    })
}

pub fn to_k8s(controller: &ReplicaController) -> OrchestratorResult<ReplicationController> {
    let mut template: PodTemplateSpec = if controller.template.is_null() {
        PodTemplateSpec::default()
    } else {
        serde_json::from_value(controller.template.clone())
            .map_err(|e| OrchestratorError::Codec(e.to_string()))?
    };
    template.metadata.get_or_insert_with(ObjectMeta::default).labels =
        non_empty(&controller.template_labels);

    Ok(ReplicationController {
        metadata: ObjectMeta {
            name: Some(controller.name.clone()),
            resource_version: controller.resource_version.clone(),
            labels: non_empty(&controller.labels),
            ..Default::default()
        },
        spec: Some(ReplicationControllerSpec {
            replicas: Some(replica_count(controller.replicas)?),
            selector: non_empty(&controller.selector),
            template: Some(template),
            ..Default::default()
        }),
        status: None,
    })
}

pub(crate) fn replica_count(replicas: u32) -> OrchestratorResult<i32> {
    i32::try_from(replicas)
        .map_err(|_| OrchestratorError::Codec(format!("replica count {replicas} out of range")))
}

pub(crate) fn clamp_count(n: i32) -> u32 {
    u32::try_from(n).unwrap_or(0)
}

fn non_empty(labels: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!labels.is_empty()).then(|| labels.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cluster_object() -> ReplicationController {
        serde_json::from_value(json!({
            "metadata": {
                "name": "web",
                "resourceVersion": "881",
                "labels": {"app": "web"}
            },
            "spec": {
                "replicas": 3,
                "selector": {"app": "web"},
                "template": {
                    "metadata": {
                        "labels": {"app": "web"},
                        "annotations": {"team": "edge"}
                    },
                    "spec": {
                        "containers": [{"name": "web", "image": "acme/web:latest"}]
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn reads_cluster_object() {
        let rc = from_k8s(&cluster_object()).unwrap();
        assert_eq!(rc.name, "web");
        assert_eq!(rc.resource_version.as_deref(), Some("881"));
        assert_eq!(rc.replicas, 3);
        assert_eq!(rc.selector["app"], "web");
        assert_eq!(rc.template_labels["app"], "web");
        assert_eq!(rc.template["spec"]["containers"][0]["image"], "acme/web:latest");
        assert!(rc.template["metadata"].get("labels").is_none());
    }

    #[test]
    fn edits_survive_the_trip_back() {
        let mut rc = from_k8s(&cluster_object()).unwrap();
        rc.name = "web-0a1b2c3d4e5f6071".to_string();
        rc.resource_version = None;
        rc.replicas = 0;
        rc.template_labels
            .insert("deployment".to_string(), "0a1b2c3d4e5f6071".to_string());

        let obj = to_k8s(&rc).unwrap();
        assert_eq!(obj.metadata.name.as_deref(), Some("web-0a1b2c3d4e5f6071"));
        assert_eq!(obj.metadata.resource_version, None);
        let spec = obj.spec.unwrap();
        assert_eq!(spec.replicas, Some(0));
        let template = spec.template.unwrap();
        let meta = template.metadata.unwrap();
        assert_eq!(meta.labels.unwrap()["deployment"], "0a1b2c3d4e5f6071");
        assert_eq!(meta.annotations.unwrap()["team"], "edge");
        assert_eq!(template.spec.unwrap().containers[0].image.as_deref(), Some("acme/web:latest"));
    }

    #[test]
    fn bare_controller_converts() {
        let obj = to_k8s(&ReplicaController::new("web", 2)).unwrap();
        let spec = obj.spec.unwrap();
        assert_eq!(spec.selector, None);
        assert!(spec.template.is_some());

        let back = from_k8s(&ReplicationController {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        assert_eq!(back.replicas, 1);
        assert!(back.template.is_null());
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(clamp_count(-2), 0);
        assert!(replica_count(u32::MAX).is_err());
    }
}
