//! Product-specific cache logic, including the fleet-size rule for edits.

pub mod dtos;
pub mod entity;
pub mod error;

pub use dtos::*;
pub use entity::validate_draft;
pub use error::*;
