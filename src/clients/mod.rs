//! Typed handles to the actors. Cloning a client is cheap; every clone talks to
//! the same actor.

#[macro_use]
mod macros;

pub mod order_client;
pub mod product_client;
pub mod settings_client;
pub mod sync_client;
pub mod user_client;

pub use order_client::{OrderClient, Placement};
pub use product_client::ProductClient;
pub use settings_client::SettingsClient;
pub use sync_client::SyncClient;
pub use user_client::UserClient;
