//! Intake error types.

use thiserror::Error;

/// Errors produced while normalizing an inbound notification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("unrecognized webhook payload")]
    UnrecognizedPayload,
}

pub type IntakeResult<T> = Result<T, IntakeError>;
