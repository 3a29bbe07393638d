//! Backend-neutral controller definition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A replicated workload controller as seen by the rollout.
///
/// Label maps are ordered so the serialized form, and therefore the
/// content hash, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplicaController {
    pub name: String,
    /// Backend revision stamp. `None` for objects not yet created.
    pub resource_version: Option<String>,
    /// Desired replica count.
    pub replicas: u32,
    /// Labels on the controller object itself.
    pub labels: BTreeMap<String, String>,
    /// Pod selector.
    pub selector: BTreeMap<String, String>,
    /// Labels stamped on pods created from the template.
    pub template_labels: BTreeMap<String, String>,
    /// Remaining pod template, opaque to the rollout.
    pub template: serde_json::Value,
}

impl ReplicaController {
    pub fn new(name: impl Into<String>, replicas: u32) -> Self {
        Self {
            name: name.into(),
            replicas,
            ..Default::default()
        }
    }
}

/// The fields that identify a controller revision.
#[derive(Serialize)]
struct HashedFields<'a> {
    name: &'a str,
    replicas: u32,
    labels: &'a BTreeMap<String, String>,
    selector: &'a BTreeMap<String, String>,
    template_labels: &'a BTreeMap<String, String>,
    template: &'a serde_json::Value,
}

/// Deterministic short hash of a controller definition.
///
/// The resource version is excluded, so two reads of an unchanged
/// controller hash identically.
pub fn content_hash(controller: &ReplicaController) -> String {
    let fields = HashedFields {
        name: &controller.name,
        replicas: controller.replicas,
        labels: &controller.labels,
        selector: &controller.selector,
        template_labels: &controller.template_labels,
        template: &controller.template,
    };
    // Serializing borrowed maps and a `Value` cannot fail.
    let bytes = serde_json::to_vec(&fields).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    hex::encode(&digest[..8])
}
