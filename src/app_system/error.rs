use thiserror::Error;

use super::config::ConfigError;
use crate::order_actor::OrderError;
use crate::pricing::PricingError;
use crate::product_actor::ProductError;
use crate::remote::RemoteError;
use crate::session::SessionError;
use crate::settings_actor::SettingsError;
use crate::sync::SyncError;
use crate::user_actor::UserError;

/// Every failure the façade can report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Product(#[from] ProductError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// Network trouble the caller may retry.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Remote(e) => e.is_transient(),
            StoreError::Session(SessionError::Remote(e)) => e.is_transient(),
            StoreError::Sync(SyncError::Remote(e)) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn only_network_trouble_is_transient() {
        assert!(StoreError::from(RemoteError::Timeout(Duration::from_secs(15))).is_transient());
        assert!(StoreError::from(SessionError::Remote(RemoteError::Unreachable("down".into()))).is_transient());
        assert!(!StoreError::from(RemoteError::rejected(401, "Invalid credentials")).is_transient());
        assert!(!StoreError::from(OrderError::MissingLocation).is_transient());
    }
}
