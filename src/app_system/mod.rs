//! System orchestration, startup, and shutdown logic.

pub mod config;
pub mod error;
pub mod logging;
pub mod rental_system;

pub use config::*;
pub use error::*;
pub use logging::setup_tracing;
pub use rental_system::RentalSystem;
