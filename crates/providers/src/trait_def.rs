use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use eatc_common::config::Credentials;
use eatc_common::types::EvidenceItem;
use eatc_http::{Deadline, HttpClient};

/// HTTP statuses the scheduler treats as a rate-limit signal for the
/// provider-level circuit (spec §4.4/§7: "rate-limited (429/432)").
fn is_rate_limit_status(status: u16) -> bool {
    status == 429 || status == 432
}

/// Everything a provider adapter needs to issue calls and report results,
/// threaded through from the fan-out scheduler.
pub struct ProviderContext<'a> {
    pub http: &'a HttpClient,
    pub deadline: Deadline,
    pub credentials: &'a Credentials,
    /// Set by [`ProviderContext::note_status`] when an upstream call inside
    /// `search` came back 429/432, so the scheduler can trip the
    /// provider-level circuit even though `Search::search` itself never
    /// returns a status — the fan-out task checks this flag immediately
    /// after the adapter call returns.
    pub rate_limited: &'a AtomicBool,
}

impl<'a> ProviderContext<'a> {
    /// Record a non-2xx HTTP status observed while handling this call; a
    /// 429/432 flips `rate_limited` so the caller can open the
    /// provider-level circuit. Adapters call this for every response they
    /// inspect directly rather than routing through [`crate::support::fetch_json`].
    pub fn note_status(&self, status: u16) {
        if is_rate_limit_status(status) {
            self.rate_limited.store(true, Ordering::Relaxed);
        }
    }
}

/// Single capability every provider adapter implements (spec §4.2, §9:
/// "replaced with a struct implementing a single `Search` capability plus
/// metadata" rather than any inheritance hierarchy).
///
/// `search` never raises on upstream failure: internal errors are caught,
/// logged, and turned into an empty result plus an error counter increment
/// on the caller's [`eatc_common::types::RunContext`] — the trait itself
/// stays infallible so callers never need to handle a `Result`.
#[async_trait]
pub trait Search: Send + Sync {
    /// Stable provider tag stored on every `EvidenceItem::provider`.
    fn name(&self) -> &'static str;

    /// Default licensing tag attached to items this adapter produces.
    fn licensing(&self) -> &'static str;

    /// Minimum interval between calls to this provider's host, seconds.
    fn min_interval_secs(&self) -> f64 {
        1.0
    }

    /// Name of an environment variable that must be set for this adapter
    /// to be selected by the router (e.g. `Some("TAVILY_API_KEY")` for a
    /// paid search provider). `None` means no credential is required.
    fn required_credential(&self) -> Option<&'static str> {
        None
    }

    /// Whether this adapter's required credential (if any) is present.
    fn is_available(&self, credentials: &Credentials) -> bool {
        match self.required_credential() {
            None => true,
            Some(key) => credential_present(credentials, key),
        }
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem>;
}

fn credential_present(credentials: &Credentials, key: &str) -> bool {
    match key {
        "TAVILY_API_KEY" => credentials.tavily_api_key.is_some(),
        "BRAVE_API_KEY" => credentials.brave_api_key.is_some(),
        "SERPER_API_KEY" => credentials.serper_api_key.is_some(),
        "SERPAPI_API_KEY" => credentials.serpapi_api_key.is_some(),
        "FRED_API_KEY" => credentials.fred_api_key.is_some(),
        "NPS_API_KEY" => credentials.nps_api_key.is_some(),
        _ => false,
    }
}
