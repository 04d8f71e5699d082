use thiserror::Error;

/// Top-level error type for EATC operations.
///
/// Nothing above the HTTP substrate raises on network failure — this
/// enum exists for the operations that *are* allowed to fail loudly:
/// config loading, output writing, gate evaluation.
#[derive(Debug, Error)]
pub enum EatcError {
    // --- Config / startup errors (fail fast before a run starts) ---
    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),

    // --- Run-scoped errors ---
    #[error("empty topic")]
    EmptyTopic,

    #[error("circuit breaker open for {0}")]
    CircuitOpen(String),

    #[error("budget exhausted")]
    BudgetExhausted,

    #[error("no evidence collected")]
    NoEvidence,

    #[error("output write error: {0}")]
    OutputWrite(String),

    #[error("{0}")]
    Internal(String),
}

impl EatcError {
    /// Whether this error should abort the run before any work starts.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Validation(_))
    }
}

/// Result type alias for EATC operations.
pub type Result<T> = std::result::Result<T, EatcError>;
