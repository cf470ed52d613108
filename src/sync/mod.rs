//! Background propagation of cache mutations to the remote store.
//!
//! Callers mutate a cache, submit a [`SyncJob`] and return. The [`SyncWorker`]
//! runs the jobs one at a time in submission order, so a write aimed at a freshly
//! created entity always runs after that entity's create and can be redirected to
//! the store-assigned id. Failures never roll the cache back; they are recorded
//! and left for the next reconciliation pass.

pub mod worker;

pub use worker::SyncWorker;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    AddonSettings, GlobalFinancials, NewOrderRecord, OrderPatch, Product, UserPatch,
};
use crate::remote::RemoteError;

/// Prefix of identifiers handed out before the store has assigned one.
pub const PROVISIONAL_PREFIX: &str = "local-";

pub fn provisional_id() -> String {
    format!("{}{}", PROVISIONAL_PREFIX, uuid::Uuid::new_v4())
}

pub fn is_provisional(id: &str) -> bool {
    id.starts_with(PROVISIONAL_PREFIX)
}

/// One remote write, addressed by the id the cache knew at submission time.
#[derive(Debug, Clone)]
pub enum SyncJob {
    CreateProduct { provisional_id: String, product: Product },
    UpdateProduct { id: String, product: Product },
    DeleteProduct { id: String },
    CreateOrder { provisional_id: String, record: NewOrderRecord },
    UpdateOrder { id: String, patch: OrderPatch },
    DeleteOrder { id: String },
    UpdateUser { id: String, patch: UserPatch },
    DeleteUser { id: String },
    PutAddons(AddonSettings),
    PutFinancials(GlobalFinancials),
}

impl SyncJob {
    pub fn operation(&self) -> &'static str {
        match self {
            SyncJob::CreateProduct { .. } => "create_product",
            SyncJob::UpdateProduct { .. } => "update_product",
            SyncJob::DeleteProduct { .. } => "delete_product",
            SyncJob::CreateOrder { .. } => "create_order",
            SyncJob::UpdateOrder { .. } => "update_order",
            SyncJob::DeleteOrder { .. } => "delete_order",
            SyncJob::UpdateUser { .. } => "update_user",
            SyncJob::DeleteUser { .. } => "delete_user",
            SyncJob::PutAddons(_) => "put_addon_settings",
            SyncJob::PutFinancials(_) => "put_financials",
        }
    }

    /// Id of the entity the job writes, empty for the settings singletons.
    pub fn entity_id(&self) -> &str {
        match self {
            SyncJob::CreateProduct { provisional_id, .. }
            | SyncJob::CreateOrder { provisional_id, .. } => provisional_id,
            SyncJob::UpdateProduct { id, .. }
            | SyncJob::DeleteProduct { id }
            | SyncJob::UpdateOrder { id, .. }
            | SyncJob::DeleteOrder { id }
            | SyncJob::UpdateUser { id, .. }
            | SyncJob::DeleteUser { id } => id,
            SyncJob::PutAddons(_) | SyncJob::PutFinancials(_) => "",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// The job targets a provisional id whose create never reached the store.
    #[error("Skipped: create of {0} failed")]
    OrphanedProvisional(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

/// Entry of the visible failure log.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub operation: &'static str,
    pub entity_id: String,
    pub error: SyncError,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_ids_are_recognisable() {
        let id = provisional_id();
        assert!(is_provisional(&id));
        assert!(!is_provisional("694e949f046ce9f947da4880"));
    }
}
