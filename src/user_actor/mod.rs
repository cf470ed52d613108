//! User cache entity wiring.

pub mod entity;
pub mod error;

pub use entity::validate_patch;
pub use error::*;
