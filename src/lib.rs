//! Console rental store core.
//!
//! Every collection (users, products, orders) lives in its own cache actor.
//! Mutations land in the cache first and are then written to the remote store
//! by a single sync worker, in submission order. [`app_system::RentalSystem`]
//! wires the actors, the settings service and the session together.

pub mod actor_framework;
pub mod app_system;
pub mod availability;
pub mod catalog;
pub mod clients;
pub mod domain;
pub mod finance;
pub mod messages;
pub mod order_actor;
pub mod pricing;
pub mod product_actor;
pub mod remote;
pub mod session;
pub mod settings_actor;
pub mod sync;
pub mod user_actor;

#[cfg(test)]
mod mock_framework;

pub use app_system::{RentalSystem, StoreConfig, StoreError};
