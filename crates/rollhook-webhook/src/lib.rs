//! rollhook-webhook — registry push notification detection.
//!
//! Container registries post differently shaped JSON when an image is
//! pushed. This crate decodes an opaque request body into one of the
//! known shapes and labels it with the registry it came from.
//!
//! # Detection order
//!
//! | Priority | Kind | Distinguishing field |
//! |---|---|---|
//! | 1 | `quay.io` | `repository` is a string |
//! | 2 | `docker hub` | `repository` is an object |
//!
//! Decoding is permissive: unknown fields are ignored and missing fields
//! default. The first decoder that accepts the body wins, so a body that
//! fits several shapes (such as `{}`) is classified by priority alone.

pub mod error;
pub mod payload;

pub use error::{IntakeError, IntakeResult};
pub use payload::{
    DockerHubWebhook, DockerPushData, DockerRepository, QuayWebhook, UpdatedTags, WebhookKind,
    WebhookPayload, normalize,
};
