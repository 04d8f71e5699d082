//! Bounded-parallelism fan-out scheduler.
//!
//! A fixed worker-pool-over-a-queue pattern turned into a bounded-parallelism
//! fan-out over an in-memory task list: one task per `(provider, query)`
//! pair, capped concurrency via a semaphore, cooperative cancellation
//! tied to the run's wall-clock deadline, and a single-writer sink that
//! collects every provider's results once all tasks finish or the
//! deadline/cancellation fires first.

mod budget;

pub use budget::TokenBucket;

use std::collections::HashMap;
use std::sync::Arc;

use eatc_common::config::Credentials;
use eatc_common::types::{EvidenceItem, ProviderStatsRegistry};
use eatc_http::{Deadline, HttpClient};
use eatc_providers::{ProviderContext, Search};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Default number of concurrently in-flight provider calls.
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// Provider-level circuit: trips on its second 429 inside one run's
/// window and stays open for the cooldown, independent of the host-level
/// circuit breaker `HttpClient` already applies per call.
const PROVIDER_CIRCUIT_FAILURE_THRESHOLD: u32 = 2;
const PROVIDER_CIRCUIT_COOLDOWN_SECS: u64 = 600;

/// One fan-out unit: a provider paired with one query string to issue
/// against it and a result-count cap.
#[derive(Clone, Debug)]
pub struct SearchTask {
    pub provider: &'static str,
    pub query: String,
    pub limit: usize,
}

/// Configuration for one fan-out run.
pub struct SchedulerConfig {
    pub max_concurrency: usize,
    /// Requests/sec allotted to paid providers collectively, enforced via
    /// a shared token bucket.
    pub paid_provider_rate_per_sec: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_concurrency: DEFAULT_MAX_CONCURRENCY, paid_provider_rate_per_sec: 2.0 }
    }
}

/// Runs every `(provider, query)` task in `tasks` against `http`,
/// respecting `deadline`, returning whatever items were collected before
/// the deadline/cancellation fired. Never returns an error: a task that
/// fails, times out, or gets cut off by cancellation simply contributes
/// no items — callers observe partial results via `counters` on
/// `eatc_common::types::RunContext`.
pub async fn fan_out(
    tasks: Vec<SearchTask>,
    adapters: &HashMap<&'static str, Arc<dyn Search>>,
    http: Arc<HttpClient>,
    credentials: Arc<Credentials>,
    counters: ProviderStatsRegistry,
    deadline: Deadline,
    config: &SchedulerConfig,
) -> Vec<EvidenceItem> {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
    let cancel = CancellationToken::new();
    let paid_bucket = Arc::new(TokenBucket::new(config.paid_provider_rate_per_sec.max(0.1)));

    // Cooperative cancellation tied to the wall-clock deadline: a
    // background task flips the token the instant the budget runs out so
    // every in-flight `tokio::select!` below observes it promptly rather
    // than waiting for its own call to time out independently.
    let deadline_watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline.remaining()).await;
            cancel.cancel();
        })
    };

    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        let Some(adapter) = adapters.get(task.provider).cloned() else {
            tracing::warn!(provider = task.provider, "scheduler: no adapter registered for provider");
            continue;
        };
        let semaphore = Arc::clone(&semaphore);
        let http = Arc::clone(&http);
        let credentials = Arc::clone(&credentials);
        let counters = counters.clone();
        let cancel = cancel.clone();
        let paid_bucket = Arc::clone(&paid_bucket);
        let is_paid = adapter.required_credential().is_some();

        let handle = tokio::spawn(async move {
            let permit = tokio::select! {
                p = semaphore.acquire_owned() => p.ok(),
                _ = cancel.cancelled() => None,
            };
            let Some(_permit) = permit else {
                return Vec::new();
            };
            if cancel.is_cancelled() || deadline.is_expired() {
                return Vec::new();
            }

            let circuit_key = format!("provider:{}", task.provider);
            if !http.circuits().allow(&circuit_key) {
                tracing::debug!(provider = task.provider, "provider circuit open, skipping task");
                return Vec::new();
            }

            if is_paid {
                tokio::select! {
                    _ = paid_bucket.acquire() => {},
                    _ = cancel.cancelled() => return Vec::new(),
                }
            }

            counters.record_attempt(task.provider);
            let rate_limited = std::sync::atomic::AtomicBool::new(false);
            let ctx = ProviderContext { http: &http, deadline, credentials: &credentials, rate_limited: &rate_limited };

            let result = tokio::select! {
                items = adapter.search(&task.query, task.limit, &ctx) => Some(items),
                _ = cancel.cancelled() => None,
            };

            match result {
                Some(items) => {
                    // A 429/432 observed anywhere inside `search` sets
                    // `rate_limited` (spec §4.4/S5: "on a provider
                    // returning 429-class codes a second time within a
                    // run, the scheduler opens a provider-level circuit").
                    // This is the only path that actually increments the
                    // provider circuit's failure count on throttling; the
                    // host-level circuit `HttpClient` tracks is keyed by
                    // host, not by provider, so it never trips this one.
                    if rate_limited.load(std::sync::atomic::Ordering::Relaxed) {
                        counters.record_error(task.provider);
                        http.circuits().record_failure(&circuit_key);
                    }
                    metrics::counter!("scheduler.tasks_completed", "provider" => task.provider).increment(1);
                    items
                }
                None => {
                    counters.record_error(task.provider);
                    http.circuits().record_failure(&circuit_key);
                    metrics::counter!("scheduler.tasks_cancelled", "provider" => task.provider).increment(1);
                    Vec::new()
                }
            }
        });
        handles.push(handle);
    }

    let mut collected = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(items) => collected.extend(items),
            Err(e) => tracing::warn!(error = %e, "scheduler task panicked"),
        }
    }

    deadline_watcher.abort();
    collected
}

/// Configures the circuit-breaker registry's provider-level entries up
/// front so `fan_out`'s threshold/cooldown matches spec §4.4 regardless
/// of whatever host-level defaults `HttpClient` was built with.
pub fn configure_provider_circuits(http: &HttpClient, provider_names: &[&'static str]) {
    for name in provider_names {
        http.circuits().configure(
            &format!("provider:{name}"),
            PROVIDER_CIRCUIT_FAILURE_THRESHOLD,
            PROVIDER_CIRCUIT_COOLDOWN_SECS,
        );
    }
}

/// Builds one task per `(provider, query)` pair for a flat query list,
/// applied identically across every routed provider. Finer per-provider
/// query tailoring (e.g. PubMed's narrowed-query degradation) lives
/// inside the adapter itself, not here.
pub fn build_tasks(providers: &[&'static str], queries: &[String], limit_per_task: usize) -> Vec<SearchTask> {
    let mut tasks = Vec::with_capacity(providers.len() * queries.len());
    for provider in providers {
        for query in queries {
            tasks.push(SearchTask { provider, query: query.clone(), limit: limit_per_task });
        }
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use eatc_common::config::SystemConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Adapter whose every call hits a local mock server and reports
    /// whatever status the server answers with, going through a live
    /// `get_text` call rather than faking the status directly, so the
    /// `rate_limited` propagation path is exercised end to end.
    struct ThrottledSearch {
        server_uri: String,
    }

    #[async_trait]
    impl Search for ThrottledSearch {
        fn name(&self) -> &'static str {
            "throttled-test-provider"
        }

        fn licensing(&self) -> &'static str {
            "test"
        }

        async fn search(&self, _query: &str, _limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
            let url = format!("{}/search", self.server_uri);
            match ctx.http.get_text(&url, &[], ctx.deadline).await {
                Ok(outcome) if outcome.status == 200 => Vec::new(),
                Ok(outcome) => {
                    ctx.note_status(outcome.status);
                    Vec::new()
                }
                Err(_) => Vec::new(),
            }
        }
    }

    /// Scenario S5: a provider returning a 429/432-class status a second
    /// time within one run opens the provider-level circuit for the rest
    /// of the run (spec §4.4), even though the host-level circuit
    /// `HttpClient` tracks is keyed by host and never trips on its own
    /// from a 432.
    #[tokio::test]
    async fn repeated_rate_limit_status_opens_provider_circuit() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/robots.txt")).respond_with(ResponseTemplate::new(404)).mount(&server).await;
        Mock::given(method("GET")).and(path("/search")).respond_with(ResponseTemplate::new(432)).mount(&server).await;

        let mut system = SystemConfig::defaults();
        system.http.default_min_interval_secs = 0.0;
        let dir = tempfile::tempdir().unwrap();
        let http = Arc::new(eatc_http::HttpClient::new(&system.http, dir.path()));
        let credentials = Arc::new(eatc_common::config::Credentials::default());
        let counters = ProviderStatsRegistry::default();

        const PROVIDER: &str = "throttled-test-provider";
        configure_provider_circuits(&http, &[PROVIDER]);
        assert!(http.circuits().allow(&format!("provider:{PROVIDER}")));

        let adapter: Arc<dyn Search> = Arc::new(ThrottledSearch { server_uri: server.uri() });
        let mut adapters: HashMap<&'static str, Arc<dyn Search>> = HashMap::new();
        adapters.insert(PROVIDER, adapter);

        let tasks = vec![
            SearchTask { provider: PROVIDER, query: "q1".into(), limit: 5 },
            SearchTask { provider: PROVIDER, query: "q2".into(), limit: 5 },
        ];
        let deadline = Deadline::from_budget_secs(30);
        let config = SchedulerConfig::default();

        let _ = fan_out(tasks, &adapters, Arc::clone(&http), credentials, counters, deadline, &config).await;

        assert!(!http.circuits().allow(&format!("provider:{PROVIDER}")));
    }
}
