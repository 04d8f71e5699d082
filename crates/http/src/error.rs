use thiserror::Error;

/// Failure modes for a single HTTP substrate call.
///
/// Nothing above the HTTP substrate is allowed to propagate a raw
/// network error — callers match on these variants and degrade (skip
/// the item, log, move on) rather than aborting the run.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("circuit open for {0}")]
    CircuitOpen(String),

    #[error("blocked by robots.txt: {0}")]
    RobotsBlocked(String),

    #[error("paywall detected: {0}")]
    Paywall(String),

    #[error("cloudflare challenge: {0}")]
    CloudflareChallenge(String),

    #[error("too many redirects: {0}")]
    TooManyRedirects(String),

    #[error("content exceeded size cap: {0} bytes")]
    TooLarge(u64),

    #[error("request error: {0}")]
    Request(String),

    #[error("rate limiter timeout for host {0}")]
    RateLimitTimeout(String),

    #[error("request cancelled at deadline")]
    RequestCancelled,
}

pub type Result<T> = std::result::Result<T, HttpError>;

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        HttpError::Request(e.to_string())
    }
}
