use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::OrderStatus;

/// Errors that can occur during order operations.
///
/// Everything except `ActorCommunicationError` is a local precondition failure,
/// raised before any cache is touched.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("Invalid user: {0}")]
    InvalidUser(String),
    #[error("Product out of stock: {0}")]
    OutOfStock(String),
    #[error("Add a delivery location before ordering")]
    MissingLocation,
    #[error("An ID proof is required before ordering")]
    MissingIdProof,
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),
    #[error("Invalid rental duration: {0}")]
    InvalidDuration(u32),
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("User {0} must have a verified ID before approval")]
    UserNotVerified(String),
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),
    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError<OrderError>> for OrderError {
    fn from(error: FrameworkError<OrderError>) -> Self {
        match error {
            FrameworkError::NotFound { id, .. } => OrderError::NotFound(id),
            FrameworkError::Entity(e) => e,
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
