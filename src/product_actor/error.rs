use thiserror::Error;

use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Product out of stock: {0}")]
    OutOfStock(String),
    #[error("Invalid price: {0}")]
    InvalidPrice(f64),
    #[error("Product validation error: {0}")]
    ValidationError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError<ProductError>> for ProductError {
    fn from(error: FrameworkError<ProductError>) -> Self {
        match error {
            FrameworkError::NotFound { id, .. } => ProductError::NotFound(id),
            FrameworkError::Entity(e) => e,
            other => ProductError::ActorCommunicationError(other.to_string()),
        }
    }
}
