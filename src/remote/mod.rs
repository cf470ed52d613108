//! Remote Store Client: typed access to the persistence API.
//!
//! The [`RemoteStore`] trait is the only seam between the caches and the store.
//! Every record read through it has already been normalized by [`records`], so
//! callers never see the store's native `_id` field or a missing optional field.

pub mod http;
pub mod memory;
pub mod records;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    AddonSettings, Credentials, GlobalFinancials, NewOrderRecord, Order, OrderPatch, Product,
    Registration, User, UserPatch,
};

pub use http::HttpRemoteStore;
pub use memory::InMemoryRemoteStore;

/// Reason string the store uses when a login names an unknown account.
pub const USER_NOT_FOUND: &str = "User not found";

/// Remote failures, split by how callers should react to them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    /// Network failure. Surfaced as "try again", optimistic state is kept.
    #[error("Remote store unreachable: {0}")]
    Unreachable(String),
    #[error("Remote store did not answer within {0:?}")]
    Timeout(Duration),
    /// The store understood the request and refused it.
    #[error("Remote store rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Remote client configuration error: {0}")]
    Configuration(String),
}

impl RemoteError {
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        RemoteError::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// The login answer that triggers social auto-registration.
    pub fn is_user_not_found(&self) -> bool {
        matches!(self, RemoteError::Rejected { status: 401 | 404, reason } if reason == USER_NOT_FOUND)
    }

    /// Transient failures worth a "try again" message.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Unreachable(_) | RemoteError::Timeout(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Runs a store call, giving up after `timeout`.
pub async fn bounded<T>(timeout: Duration, request: impl Future<Output = RemoteResult<T>>) -> RemoteResult<T> {
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| RemoteError::Timeout(timeout))?
}

/// Which orders a fetch should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    All,
    OwnedBy(String),
}

impl OrderScope {
    pub fn includes(&self, order: &Order) -> bool {
        match self {
            OrderScope::All => true,
            OrderScope::OwnedBy(user_id) => &order.user_id == user_id,
        }
    }
}

/// Request/response contract of the persistence service.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn list_products(&self) -> RemoteResult<Vec<Product>>;
    /// Returns the store-assigned identifier.
    async fn create_product(&self, product: &Product) -> RemoteResult<String>;
    async fn update_product(&self, id: &str, product: &Product) -> RemoteResult<()>;
    async fn delete_product(&self, id: &str) -> RemoteResult<()>;

    async fn list_orders(&self, scope: &OrderScope) -> RemoteResult<Vec<Order>>;
    async fn create_order(&self, order: &NewOrderRecord) -> RemoteResult<String>;
    async fn update_order(&self, id: &str, patch: &OrderPatch) -> RemoteResult<()>;
    async fn delete_order(&self, id: &str) -> RemoteResult<()>;

    async fn list_users(&self) -> RemoteResult<Vec<User>>;
    async fn create_user(&self, registration: &Registration) -> RemoteResult<String>;
    async fn update_user(&self, id: &str, patch: &UserPatch) -> RemoteResult<()>;
    async fn delete_user(&self, id: &str) -> RemoteResult<()>;
    async fn login(&self, credentials: &Credentials) -> RemoteResult<User>;
    async fn id_proof(&self, user_id: &str) -> RemoteResult<Vec<u8>>;

    async fn addon_settings(&self) -> RemoteResult<AddonSettings>;
    async fn put_addon_settings(&self, settings: &AddonSettings) -> RemoteResult<()>;
    async fn financials(&self) -> RemoteResult<GlobalFinancials>;
    async fn put_financials(&self, financials: &GlobalFinancials) -> RemoteResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_not_found_is_recognised_on_401_only_with_reason() {
        assert!(RemoteError::rejected(401, USER_NOT_FOUND).is_user_not_found());
        assert!(!RemoteError::rejected(401, "Invalid credentials").is_user_not_found());
        assert!(!RemoteError::Unreachable("connection refused".into()).is_user_not_found());
    }
}
