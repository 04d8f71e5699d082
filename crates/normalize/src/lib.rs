//! URL canonicalization, content fetch/extraction, paywall resolution,
//! and quote extraction.

pub mod content;
pub mod html;
pub mod paywall;
pub mod pdf;
pub mod quote;
pub mod url_norm;

pub use content::{fetch_and_extract, FetchedContent};
pub use url_norm::canonicalize_url;
