//! Known registry payload shapes and the ordered decoder table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{IntakeError, IntakeResult};

/// Registry format a payload was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookKind {
    #[serde(rename = "quay.io")]
    Quay,
    #[serde(rename = "docker hub")]
    DockerHub,
}

impl WebhookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quay => "quay.io",
            Self::DockerHub => "docker hub",
        }
    }
}

impl fmt::Display for WebhookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Quay ───────────────────────────────────────────────────────

/// Repository push notification sent by quay.io.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuayWebhook {
    pub docker_url: Option<String>,
    pub homepage: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub pruned_image_count: Option<i64>,
    pub pushed_image_count: Option<i64>,
    /// `namespace/name`. Always a string for Quay.
    pub repository: Option<String>,
    pub updated_tags: Option<UpdatedTags>,
    pub visibility: Option<String>,
}

/// Quay has sent both a plain tag list and a tag → digest map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdatedTags {
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

// ── Docker Hub ─────────────────────────────────────────────────

/// Repository push notification sent by Docker Hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerHubWebhook {
    pub callback_url: Option<String>,
    pub push_data: Option<DockerPushData>,
    /// Always an object for Docker Hub.
    pub repository: Option<DockerRepository>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerPushData {
    pub images: Value,
    /// Unix seconds. Docker Hub has sent both integers and floats here.
    pub pushed_at: Option<f64>,
    pub pusher: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerRepository {
    pub comment_count: Option<i64>,
    pub date_created: Option<f64>,
    pub description: Option<String>,
    pub full_description: Option<String>,
    pub is_official: Option<bool>,
    pub is_private: Option<bool>,
    pub is_trusted: Option<bool>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub owner: Option<String>,
    pub repo_name: Option<String>,
    pub repo_url: Option<String>,
    pub star_count: Option<i64>,
    pub status: Option<String>,
}

// ── Normalized payload ─────────────────────────────────────────

/// A decoded push notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WebhookPayload {
    Quay(QuayWebhook),
    DockerHub(DockerHubWebhook),
}

impl WebhookPayload {
    pub fn kind(&self) -> WebhookKind {
        match self {
            Self::Quay(_) => WebhookKind::Quay,
            Self::DockerHub(_) => WebhookKind::DockerHub,
        }
    }

    /// Best-effort `namespace/name` of the pushed repository.
    pub fn repository(&self) -> Option<&str> {
        match self {
            Self::Quay(q) => q.repository.as_deref(),
            Self::DockerHub(d) => d.repository.as_ref().and_then(|r| r.repo_name.as_deref()),
        }
    }
}

type Decoder = fn(&Value) -> Result<WebhookPayload, serde_json::Error>;

fn decode_quay(value: &Value) -> Result<WebhookPayload, serde_json::Error> {
    QuayWebhook::deserialize(value).map(WebhookPayload::Quay)
}

fn decode_docker_hub(value: &Value) -> Result<WebhookPayload, serde_json::Error> {
    DockerHubWebhook::deserialize(value).map(WebhookPayload::DockerHub)
}

/// Decoders in priority order.
const DECODERS: [(WebhookKind, Decoder); 2] = [
    (WebhookKind::Quay, decode_quay),
    (WebhookKind::DockerHub, decode_docker_hub),
];

/// Decode a raw request body into the first registry shape that accepts it.
pub fn normalize(body: &[u8]) -> IntakeResult<WebhookPayload> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "webhook body is not JSON");
        IntakeError::UnrecognizedPayload
    })?;

    // Derived struct decoding also accepts sequences; only objects count.
    if !value.is_object() {
        return Err(IntakeError::UnrecognizedPayload);
    }

    for (kind, decode) in DECODERS {
        match decode(&value) {
            Ok(payload) => return Ok(payload),
            Err(e) => debug!(%kind, error = %e, "payload does not match"),
        }
    }

    Err(IntakeError::UnrecognizedPayload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCKER_HUB: &str = r#"{
        "callback_url": "https://registry.hub.docker.com/u/acme/web/hook/2141b5bi5i5b02bec/",
        "push_data": {
            "images": ["27d47432a69bca5f2700e4dff7de0388ed65f9d3fb1ec645e2bc24c223dc1cc3"],
            "pushed_at": 1417566161,
            "pusher": "trustedbuilder",
            "tag": "latest"
        },
        "repository": {
            "comment_count": 0,
            "date_created": 1417494799,
            "description": "",
            "full_description": null,
            "is_official": false,
            "is_private": true,
            "is_trusted": true,
            "name": "web",
            "namespace": "acme",
            "owner": "acme",
            "repo_name": "acme/web",
            "repo_url": "https://registry.hub.docker.com/u/acme/web/",
            "star_count": 0,
            "status": "Active"
        }
    }"#;

    const QUAY: &str = r#"{
        "repository": "acme/web",
        "namespace": "acme",
        "name": "web",
        "docker_url": "quay.io/acme/web",
        "homepage": "https://quay.io/repository/acme/web",
        "visibility": "private",
        "pushed_image_count": 1,
        "pruned_image_count": 0,
        "updated_tags": ["latest"]
    }"#;

    #[test]
    fn docker_hub_payload_is_docker_hub() {
        let payload = normalize(DOCKER_HUB.as_bytes()).unwrap();
        assert_eq!(payload.kind(), WebhookKind::DockerHub);
        assert_eq!(payload.kind().to_string(), "docker hub");
        assert_eq!(payload.repository(), Some("acme/web"));
    }

    #[test]
    fn quay_payload_is_quay() {
        let payload = normalize(QUAY.as_bytes()).unwrap();
        assert_eq!(payload.kind(), WebhookKind::Quay);
        assert_eq!(payload.kind().to_string(), "quay.io");
        assert_eq!(payload.repository(), Some("acme/web"));
    }

    #[test]
    fn quay_tag_map_is_accepted() {
        let body = r#"{"repository": "acme/web", "updated_tags": {"latest": "sha256:abc"}}"#;
        let payload = normalize(body.as_bytes()).unwrap();
        match payload {
            WebhookPayload::Quay(q) => {
                let Some(UpdatedTags::Map(tags)) = &q.updated_tags else {
                    panic!("expected a tag map, got {:?}", q.updated_tags);
                };
                assert_eq!(tags["latest"], "sha256:abc");
            }
            other => panic!("expected Quay, got {other:?}"),
        }
    }

    #[test]
    fn empty_object_matches_first_decoder() {
        let payload = normalize(b"{}").unwrap();
        assert_eq!(payload.kind(), WebhookKind::Quay);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let body = r#"{"repository": "acme/web", "something_new": {"nested": true}}"#;
        assert_eq!(normalize(body.as_bytes()).unwrap().kind(), WebhookKind::Quay);
    }

    #[test]
    fn shape_matching_neither_is_unrecognized() {
        // A numeric repository fits neither the Quay string nor the Docker object.
        let body = r#"{"repository": 42}"#;
        assert_eq!(normalize(body.as_bytes()), Err(IntakeError::UnrecognizedPayload));
    }

    #[test]
    fn non_json_is_unrecognized() {
        assert_eq!(normalize(b"not json"), Err(IntakeError::UnrecognizedPayload));
        assert_eq!(normalize(b""), Err(IntakeError::UnrecognizedPayload));
    }

    #[test]
    fn non_object_json_is_unrecognized() {
        assert_eq!(normalize(b"[]"), Err(IntakeError::UnrecognizedPayload));
        assert_eq!(normalize(b"\"push\""), Err(IntakeError::UnrecognizedPayload));
        assert_eq!(normalize(b"null"), Err(IntakeError::UnrecognizedPayload));
    }

    #[test]
    fn payload_serializes_without_variant_wrapper() {
        let payload = normalize(QUAY.as_bytes()).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["repository"], "acme/web");
    }
}
