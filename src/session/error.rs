use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("Session storage error: {0}")]
    Storage(String),
}
