//! Order cache entity: the status state machine and expense bookkeeping.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
