pub mod config;
pub mod domain;
pub mod error;
pub mod ids;
pub mod types;

pub use error::{EatcError, Result};
pub use ids::*;
