//! Business entities. Pure data, no actor or transport concerns.

pub mod user;
pub mod product;
pub mod order;
pub mod settings;

pub use user::*;
pub use product::*;
pub use order::*;
pub use settings::*;
