//! Rollout error types.

use std::time::Duration;

use thiserror::Error;

use rollhook_state::{AttemptFailure, FailureKind};

/// Errors reported by an orchestration backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("controller not found: {0}")]
    NotFound(String),

    #[error("controller already exists: {0}")]
    AlreadyExists(String),

    #[error("orchestration api error: {0}")]
    Api(String),

    #[error("controller encoding error: {0}")]
    Codec(String),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Terminal failure of a replacement attempt.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("fetch controller {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: OrchestratorError,
    },

    #[error("timed out after {timeout:?} waiting for {controller} to accept {desired} replicas")]
    RolloutTimeout {
        controller: String,
        desired: u32,
        timeout: Duration,
    },

    #[error(transparent)]
    Collaborator(#[from] OrchestratorError),
}

pub type ReplaceResult<T> = Result<T, ReplaceError>;

impl ReplaceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Fetch { .. } => FailureKind::Fetch,
            Self::RolloutTimeout { .. } => FailureKind::RolloutTimeout,
            Self::Collaborator(_) => FailureKind::Collaborator,
        }
    }
}

impl From<&ReplaceError> for AttemptFailure {
    fn from(err: &ReplaceError) -> Self {
        AttemptFailure::new(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_taxonomy() {
        let fetch = ReplaceError::Fetch {
            name: "web".to_string(),
            source: OrchestratorError::NotFound("web".to_string()),
        };
        assert_eq!(fetch.kind(), FailureKind::Fetch);

        let timeout = ReplaceError::RolloutTimeout {
            controller: "web-1".to_string(),
            desired: 3,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(timeout.kind(), FailureKind::RolloutTimeout);

        let api: ReplaceError = OrchestratorError::Api("connection refused".to_string()).into();
        assert_eq!(api.kind(), FailureKind::Collaborator);
    }

    #[test]
    fn collaborator_message_is_verbatim() {
        let err: ReplaceError = OrchestratorError::Api("etcd leader changed".to_string()).into();
        let failure = AttemptFailure::from(&err);
        assert_eq!(failure.kind, FailureKind::Collaborator);
        assert_eq!(failure.message, "orchestration api error: etcd leader changed");
    }
}
