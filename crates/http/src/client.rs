use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use eatc_common::config::HttpConfig;
use rand::Rng;

use crate::cache::{parse_cache_control, CacheEntry, ResponseCache};
use crate::circuit::CircuitBreakerRegistry;
use crate::error::{HttpError, Result};
use crate::identity::headers_for_host;
use crate::paywall::{is_low_value_paywalled_host, looks_gated, path_has_paywall_hint};
use crate::pdf::PdfFetcher;
use crate::redact::redact;
use crate::robots::RobotsCache;
use crate::throttle::{default_overrides, HostThrottle};

/// Outcome of a successful text fetch.
#[derive(Clone, Debug)]
pub struct FetchOutcome {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub from_cache: bool,
}

/// A wall-clock deadline shared across every I/O call in a run.
/// Every call computes `min(call_default, deadline - now)`.
#[derive(Clone, Copy, Debug)]
pub struct Deadline(pub Instant);

impl Deadline {
    pub fn from_budget_secs(budget_seconds: u64) -> Self {
        Self(Instant::now() + Duration::from_secs(budget_seconds))
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn call_timeout(&self, call_default: Duration) -> Duration {
        call_default.min(self.remaining())
    }
}

/// The polite HTTP substrate: header merge, per-host throttling,
/// robots cache, on-disk response cache, streaming PDF fetch, circuit
/// breaker, paywall guard and sensitive-value redaction, all wired around
/// a single `reqwest::Client`.
pub struct HttpClient {
    client: reqwest::Client,
    throttle: HostThrottle,
    circuits: CircuitBreakerRegistry,
    cache: ResponseCache,
    robots: RobotsCache,
    pdf: PdfFetcher,
    contact_email: Option<String>,
}

impl HttpClient {
    pub fn new(config: &HttpConfig, cache_dir: impl Into<std::path::PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(8))
            .build()
            .expect("reqwest client build");

        let mut throttle = HostThrottle::new(config.default_min_interval_secs);
        for (host, interval) in default_overrides() {
            throttle = throttle.with_override(host, interval);
        }

        Self {
            robots: RobotsCache::new(client.clone(), config.robots_timeout_secs),
            pdf: PdfFetcher::new(client.clone(), config.pdf.max_mb, config.pdf.retries),
            cache: ResponseCache::new(cache_dir, Duration::from_secs(config.cache_default_ttl_seconds)),
            circuits: CircuitBreakerRegistry::new(config.circuit_breaker_failures, config.circuit_breaker_cooldown_seconds),
            contact_email: config.contact_email.clone(),
            client,
            throttle,
        }
    }

    fn host_of(url: &str) -> Result<String> {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .ok_or_else(|| HttpError::Request(format!("invalid url: {url}")))
    }

    /// Fetch the circuit breaker registry, for the scheduler to consult
    /// before dispatching a provider's task.
    pub fn circuits(&self) -> &CircuitBreakerRegistry {
        &self.circuits
    }

    /// `GET` a URL and return its text body, honoring cache, robots,
    /// throttle, circuit breaker, and paywall guard. Never panics on
    /// network failure; every failure path is a typed [`HttpError`].
    pub async fn get_text(
        &self,
        url: &str,
        extra_headers: &[(&str, &str)],
        deadline: Deadline,
    ) -> Result<FetchOutcome> {
        let host = Self::host_of(url)?;

        if path_has_paywall_hint(url::Url::parse(url).map(|u| u.path().to_string()).unwrap_or_default().as_str())
            || is_low_value_paywalled_host(&host)
        {
            tracing::debug!(url = %redact(url), "skipping known paywalled path");
            return Err(HttpError::Paywall(host));
        }

        if !self.circuits.allow(&host) {
            return Err(HttpError::CircuitOpen(host));
        }

        let user_agent = {
            let headers = headers_for_host(&host, self.contact_email.as_deref());
            headers.get("User-Agent").cloned().unwrap_or_default()
        };
        if !self.robots.is_allowed(url, &user_agent).await {
            return Err(HttpError::RobotsBlocked(host));
        }

        let cached = self.cache.get("GET", url).await;
        if let Some(cached) = &cached {
            let age = Duration::from_secs(
                (chrono::Utc::now().timestamp() as u64).saturating_sub(cached.stored_at_epoch_secs),
            );
            let ttl = Duration::from_secs(parse_cache_control(cached.cache_control.as_deref()));
            if age < ttl {
                return Ok(FetchOutcome {
                    status: cached.status_code,
                    headers: HashMap::new(),
                    body: cached.body.clone(),
                    from_cache: true,
                });
            }
        }

        self.throttle.acquire(&host).await;

        if deadline.is_expired() {
            self.circuits.record_failure(&host);
            return Err(HttpError::RequestCancelled);
        }

        let mut headers = headers_for_host(&host, self.contact_email.as_deref());
        for (k, v) in extra_headers {
            headers.insert((*k).to_string(), (*v).to_string());
        }
        // Stale cache entry present: revalidate instead of an unconditional
        // refetch, per spec §4.1 ("revalidate with If-None-Match /
        // If-Modified-Since; 304 refreshes timestamp").
        if let Some(cached) = &cached {
            if let Some(etag) = &cached.etag {
                headers.insert("If-None-Match".to_string(), etag.clone());
            }
            if let Some(last_modified) = &cached.last_modified {
                headers.insert("If-Modified-Since".to_string(), last_modified.clone());
            }
        }

        let result = self.get_with_retries(url, &headers, deadline).await;
        if let (Ok(outcome), Some(cached)) = (&result, &cached) {
            if outcome.status == 304 {
                self.circuits.record_success(&host);
                self.cache.touch("GET", url, cached).await;
                return Ok(FetchOutcome {
                    status: cached.status_code,
                    headers: HashMap::new(),
                    body: cached.body.clone(),
                    from_cache: true,
                });
            }
        }
        match &result {
            Ok(outcome) if outcome.status < 500 && outcome.status != 429 => {
                self.circuits.record_success(&host);
            }
            _ => self.circuits.record_failure(&host),
        }

        let outcome = result?;
        if looks_gated(outcome.status, &outcome.body) {
            return Err(HttpError::Paywall(host));
        }
        let cf_header = outcome.headers.get("server").cloned();
        if crate::paywall::is_cloudflare_challenge(cf_header.as_deref(), &outcome.body) {
            return Err(HttpError::CloudflareChallenge(host));
        }

        if outcome.status == 200 {
            self.cache
                .put(
                    "GET",
                    url,
                    CacheEntry {
                        body: outcome.body.clone(),
                        status_code: outcome.status,
                        content_type: outcome.headers.get("content-type").cloned(),
                        etag: outcome.headers.get("etag").cloned(),
                        last_modified: outcome.headers.get("last-modified").cloned(),
                        cache_control: outcome.headers.get("cache-control").cloned(),
                        stored_at_epoch_secs: chrono::Utc::now().timestamp() as u64,
                    },
                )
                .await;
        }

        Ok(outcome)
    }

    async fn get_with_retries(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        deadline: Deadline,
    ) -> Result<FetchOutcome> {
        let retry_cfg = (3u32, Duration::from_millis(250), Duration::from_secs(4));
        let mut attempt = 0;
        let mut backoff = retry_cfg.1;

        loop {
            if deadline.is_expired() {
                return Err(HttpError::RequestCancelled);
            }
            let timeout = deadline.call_timeout(Duration::from_secs(20));

            let mut builder = self.client.get(url).timeout(timeout);
            for (k, v) in headers {
                builder = builder.header(k.as_str(), v.as_str());
            }

            let send_result = builder.send().await;
            let response = match send_result {
                Ok(r) => r,
                Err(e) if attempt + 1 < retry_cfg.0 && (e.is_timeout() || e.is_connect()) => {
                    attempt += 1;
                    sleep_with_jitter(backoff).await;
                    backoff = (backoff * 2).min(retry_cfg.2);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status().as_u16();
            if (status == 408 || status == 429 || status >= 500) && attempt + 1 < retry_cfg.0 {
                attempt += 1;
                sleep_with_jitter(backoff).await;
                backoff = (backoff * 2).min(retry_cfg.2);
                continue;
            }

            let mut out_headers = HashMap::new();
            for (k, v) in response.headers().iter() {
                if let Ok(val) = v.to_str() {
                    out_headers.insert(k.as_str().to_lowercase(), val.to_string());
                }
            }
            let body = response.text().await.unwrap_or_default();
            return Ok(FetchOutcome {
                status,
                headers: out_headers,
                body,
                from_cache: false,
            });
        }
    }

    /// `GET` a binary resource (images, SDMX payloads) without caching
    /// through the text cache layer.
    pub async fn get_binary(&self, url: &str, deadline: Deadline) -> Result<(u16, Bytes)> {
        let host = Self::host_of(url)?;
        if !self.circuits.allow(&host) {
            return Err(HttpError::CircuitOpen(host));
        }
        self.throttle.acquire(&host).await;

        let headers = headers_for_host(&host, self.contact_email.as_deref());
        let mut builder = self.client.get(url).timeout(deadline.call_timeout(Duration::from_secs(20)));
        for (k, v) in &headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        match builder.send().await {
            Ok(resp) => {
                self.circuits.record_success(&host);
                let status = resp.status().as_u16();
                let bytes = resp.bytes().await.unwrap_or_default();
                Ok((status, bytes))
            }
            Err(e) => {
                self.circuits.record_failure(&host);
                Err(e.into())
            }
        }
    }

    /// `POST` a JSON body and return the response text. Used by the paid
    /// search adapters (Tavily, Serper) whose APIs are POST-only; subject
    /// to the same throttle/circuit discipline as `get_text`, but not
    /// cached (POST responses are query-specific, not cacheable by URL).
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        extra_headers: &[(&str, &str)],
        deadline: Deadline,
    ) -> Result<FetchOutcome> {
        let host = Self::host_of(url)?;
        if !self.circuits.allow(&host) {
            return Err(HttpError::CircuitOpen(host));
        }
        self.throttle.acquire(&host).await;

        let headers = headers_for_host(&host, self.contact_email.as_deref());
        let mut builder = self
            .client
            .post(url)
            .json(body)
            .timeout(deadline.call_timeout(Duration::from_secs(20)));
        for (k, v) in &headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        for (k, v) in extra_headers {
            builder = builder.header(*k, *v);
        }

        match builder.send().await {
            Ok(resp) => {
                self.circuits.record_success(&host);
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                Ok(FetchOutcome {
                    status,
                    headers: HashMap::new(),
                    body,
                    from_cache: false,
                })
            }
            Err(e) => {
                self.circuits.record_failure(&host);
                Err(e.into())
            }
        }
    }

    /// Stream a PDF through the size-capped fetcher.
    pub async fn stream_pdf(&self, url: &str) -> Result<Bytes> {
        let host = Self::host_of(url)?;
        if !self.circuits.allow(&host) {
            return Err(HttpError::CircuitOpen(host));
        }
        self.throttle.acquire(&host).await;
        let result = self.pdf.fetch(url).await;
        match &result {
            Ok(_) => self.circuits.record_success(&host),
            Err(HttpError::TooLarge(_)) => {} // not a host failure, just an oversized artifact
            Err(_) => self.circuits.record_failure(&host),
        }
        result
    }
}

async fn sleep_with_jitter(base: Duration) {
    let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis().min(200) as u64);
    tokio::time::sleep(base + Duration::from_millis(jitter_ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_timeout_shrinks_to_remaining_budget() {
        let deadline = Deadline(Instant::now() + Duration::from_millis(50));
        std::thread::sleep(Duration::from_millis(20));
        let t = deadline.call_timeout(Duration::from_secs(20));
        assert!(t < Duration::from_secs(20));
    }

    #[test]
    fn expired_deadline_has_zero_remaining() {
        let deadline = Deadline(Instant::now() - Duration::from_secs(1));
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_cache_entry_revalidates_and_reuses_body_on_304() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("first body")
                    .insert_header("etag", "\"v1\"")
                    .insert_header("cache-control", "max-age=0"),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .and(header("If-None-Match", "\"v1\""))
            .respond_with(ResponseTemplate::new(304))
            .mount(&server)
            .await;

        let mut config = eatc_common::config::SystemConfig::defaults();
        config.http.default_min_interval_secs = 0.0;
        let dir = tempfile::tempdir().unwrap();
        let client = HttpClient::new(&config.http, dir.path());
        let deadline = Deadline::from_budget_secs(30);
        let url = format!("{}/article", server.uri());

        let first = client.get_text(&url, &[], deadline).await.unwrap();
        assert_eq!(first.body, "first body");
        assert!(!first.from_cache);

        let second = client.get_text(&url, &[], deadline).await.unwrap();
        assert_eq!(second.body, "first body");
        assert!(second.from_cache);
    }
}
