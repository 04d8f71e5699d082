pub mod cache;
pub mod circuit;
pub mod client;
pub mod error;
pub mod identity;
pub mod paywall;
pub mod pdf;
pub mod redact;
pub mod robots;
pub mod throttle;

pub use client::{Deadline, FetchOutcome, HttpClient};
pub use error::{HttpError, Result};
