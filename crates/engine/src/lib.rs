//! Top-level orchestration crate: owns startup configuration, the
//! pipeline that drives every other crate through one run, and the
//! output/log artifacts a run leaves behind.

pub mod config;
#[cfg(feature = "embeddings")]
pub mod embeddings;
pub mod output;
pub mod pipeline;
pub mod primary_search;
pub mod runlog;

pub use config::{load_config, EngineConfig};
pub use pipeline::{Pipeline, RunOutcome};
