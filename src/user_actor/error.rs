use thiserror::Error;

use crate::actor_framework::FrameworkError;

/// Errors that can occur during user operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("User already exists: {0}")]
    AlreadyExists(String),
    #[error("User validation error: {0}")]
    ValidationError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError<UserError>> for UserError {
    fn from(error: FrameworkError<UserError>) -> Self {
        match error {
            FrameworkError::NotFound { id, .. } => UserError::NotFound(id),
            FrameworkError::Entity(e) => e,
            other => UserError::ActorCommunicationError(other.to_string()),
        }
    }
}
