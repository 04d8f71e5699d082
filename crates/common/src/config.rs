use serde::{Deserialize, Serialize};

/// Top-level system configuration, deserialized from `system.toml` and then
/// overlaid with environment overrides. The engine refuses to start on
/// validation failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    pub http: HttpConfig,
    pub concurrency: ConcurrencyConfig,
    pub triangulation: TriangulationConfig,
    pub gates: GatesConfig,
    pub retry: RetryDefaults,
    pub embeddings: EmbeddingConfig,
}

impl SystemConfig {
    /// Built-in defaults for every tunable knob.
    pub fn defaults() -> Self {
        Self {
            http: HttpConfig::defaults(),
            concurrency: ConcurrencyConfig::defaults(),
            triangulation: TriangulationConfig::defaults(),
            gates: GatesConfig::defaults(),
            retry: RetryDefaults::defaults(),
            embeddings: EmbeddingConfig::defaults(),
        }
    }

    /// Overlay environment variable overrides onto a base configuration.
    /// Unset variables leave the base value untouched.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u32("HTTP_CB_FAILS") {
            self.http.circuit_breaker_failures = v;
        }
        if let Some(v) = env_u64("HTTP_CB_RESET") {
            self.http.circuit_breaker_cooldown_seconds = v;
        }
        if let Some(v) = env_f64("MAX_PDF_MB") {
            self.http.pdf.max_mb = v;
        }
        if let Some(v) = env_u32("PDF_MAX_PAGES") {
            self.http.pdf.max_pages = v;
        }
        if let Some(v) = env_u32("PDF_RETRIES") {
            self.http.pdf.retries = v;
        }
        if let Ok(v) = std::env::var("CONTACT_EMAIL") {
            if !v.is_empty() {
                self.http.contact_email = Some(v);
            }
        }
        if let Ok(v) = std::env::var("UNPAYWALL_EMAIL") {
            if !v.is_empty() {
                self.http.unpaywall_email = Some(v);
            }
        }
        if let Some(v) = env_f64("TRI_PARA_THRESHOLD") {
            self.triangulation.paraphrase_threshold_override = Some(v);
        }
        if let Some(v) = env_f64("TRI_CONTRA_TOL_PCT") {
            self.triangulation.contradiction_tolerance_pct = v;
        }
        if let Some(v) = env_bool("STRICT_MODE") {
            self.gates.strict_mode = v;
        }
        if let Some(v) = env_bool("WRITE_DRAFT_ON_FAIL") {
            self.gates.write_draft_on_fail = v;
        }
        if let Ok(v) = std::env::var("GATES_PROFILE") {
            if !v.is_empty() {
                self.gates.gates_profile = v;
            }
        }
        if let Ok(v) = std::env::var("TRUSTED_DOMAINS") {
            if !v.is_empty() {
                self.gates.trusted_domains_extra =
                    v.split(',').map(|s| s.trim().to_string()).collect();
            }
        }
        if let Some(v) = env_bool("LENIENT_RECOVERY_ON_FAIL") {
            self.gates.lenient_recovery_on_fail = v;
        }
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

/// HTTP substrate configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Mailto contact embedded in the identity header. Several upstreams
    /// (OpenAlex, Crossref, Unpaywall) require one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpaywall_email: Option<String>,
    /// Default per-host minimum interval between requests, in seconds.
    pub default_min_interval_secs: f64,
    pub circuit_breaker_failures: u32,
    pub circuit_breaker_cooldown_seconds: u64,
    /// Response cache TTL default, capped at 30 minutes per `Cache-Control`.
    pub cache_default_ttl_seconds: u64,
    pub cache_max_ttl_seconds: u64,
    /// Overall on-disk cache entry lifetime before eviction.
    pub cache_entry_ttl_days: u64,
    pub cache_entry_size_cap_bytes: u64,
    pub robots_timeout_secs: u64,
    pub pdf: PdfConfig,
}

impl HttpConfig {
    fn defaults() -> Self {
        Self {
            contact_email: None,
            unpaywall_email: None,
            default_min_interval_secs: 0.8,
            circuit_breaker_failures: 3,
            circuit_breaker_cooldown_seconds: 900,
            cache_default_ttl_seconds: 900,
            cache_max_ttl_seconds: 1800,
            cache_entry_ttl_days: 7,
            cache_entry_size_cap_bytes: 2 * 1024 * 1024,
            robots_timeout_secs: 5,
            pdf: PdfConfig::defaults(),
        }
    }
}

/// PDF fetch/extraction caps.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PdfConfig {
    pub max_mb: f64,
    pub max_pages: u32,
    pub retries: u32,
}

impl PdfConfig {
    fn defaults() -> Self {
        Self {
            max_mb: 12.0,
            max_pages: 6,
            retries: 2,
        }
    }
}

/// Fan-out scheduler concurrency.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Bounded-parallelism task pool size — target ~32 concurrent fetches.
    pub fanout_pool_size: usize,
}

impl ConcurrencyConfig {
    fn defaults() -> Self {
        Self { fanout_pool_size: 32 }
    }
}

/// Paraphrase clustering and contradiction-filter tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriangulationConfig {
    pub paraphrase_threshold_min: f64,
    pub paraphrase_threshold_max: f64,
    /// `TRI_PARA_THRESHOLD` override — bypasses the adaptive percentile calc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paraphrase_threshold_override: Option<f64>,
    /// Threshold used on the single degraded-recovery retry.
    pub degraded_paraphrase_threshold: f64,
    pub jaccard_fallback_threshold: f64,
    pub minhash_shingle_size: usize,
    pub minhash_lsh_threshold: f64,
    pub minhash_num_perm: usize,
    /// Relative numeric disagreement fraction that counts as a conflicting
    /// pair. 0.35 rather than a tighter 0.15, since survey and estimate
    /// figures routinely disagree by a quarter or more between legitimate
    /// sources.
    pub contradiction_tolerance_pct: f64,
    /// Fraction of pairs in conflict above which a cluster is dropped.
    pub contradiction_fraction_cap: f64,
}

impl TriangulationConfig {
    fn defaults() -> Self {
        Self {
            paraphrase_threshold_min: 0.32,
            paraphrase_threshold_max: 0.48,
            paraphrase_threshold_override: None,
            degraded_paraphrase_threshold: 0.34,
            jaccard_fallback_threshold: 0.32,
            minhash_shingle_size: 6,
            minhash_lsh_threshold: 0.92,
            minhash_num_perm: 128,
            contradiction_tolerance_pct: 0.35,
            contradiction_fraction_cap: 0.10,
        }
    }
}

/// Quality gate behavior switches (C10).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatesConfig {
    pub strict_mode: bool,
    pub write_draft_on_fail: bool,
    pub gates_profile: String,
    /// Additional trusted domains beyond the built-in set, from
    /// `TRUSTED_DOMAINS` (comma-separated).
    #[serde(default)]
    pub trusted_domains_extra: Vec<String>,
    pub lenient_recovery_on_fail: bool,
}

impl GatesConfig {
    fn defaults() -> Self {
        Self {
            strict_mode: false,
            write_draft_on_fail: true,
            gates_profile: "default".to_string(),
            trusted_domains_extra: Vec::new(),
            lenient_recovery_on_fail: false,
        }
    }
}

/// API keys / contact identities read once at startup (`*_API_KEY` and
/// `UNPAYWALL_EMAIL`). Presence of a paid-search key is what gates that
/// provider into the router's tiers.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub contact_email: Option<String>,
    pub unpaywall_email: Option<String>,
    pub tavily_api_key: Option<String>,
    pub brave_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub serpapi_api_key: Option<String>,
    pub fred_api_key: Option<String>,
    pub nps_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            contact_email: non_empty_env("CONTACT_EMAIL"),
            unpaywall_email: non_empty_env("UNPAYWALL_EMAIL"),
            tavily_api_key: non_empty_env("TAVILY_API_KEY"),
            brave_api_key: non_empty_env("BRAVE_API_KEY"),
            serper_api_key: non_empty_env("SERPER_API_KEY"),
            serpapi_api_key: non_empty_env("SERPAPI_API_KEY"),
            fred_api_key: non_empty_env("FRED_API_KEY"),
            nps_api_key: non_empty_env("NPS_API_KEY"),
        }
    }

    pub fn has_any_paid_search(&self) -> bool {
        self.tavily_api_key.is_some()
            || self.brave_api_key.is_some()
            || self.serper_api_key.is_some()
            || self.serpapi_api_key.is_some()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Default retry parameters for transient HTTP and provider calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryDefaults {
    pub http: RetryConfig,
    pub llm_api: RetryConfig,
}

impl RetryDefaults {
    fn defaults() -> Self {
        Self {
            http: RetryConfig {
                max_attempts: 3,
                initial_backoff_ms: 250,
                max_backoff_ms: 4000,
                backoff_multiplier: 2.0,
                jitter: true,
            },
            llm_api: RetryConfig {
                max_attempts: 4,
                initial_backoff_ms: 500,
                max_backoff_ms: 8000,
                backoff_multiplier: 2.0,
                jitter: true,
            },
        }
    }
}

/// Embedding backend configuration for the paraphrase clusterer's
/// cosine-similarity path. Only consulted when `eatc-engine` is built
/// with the `embeddings` feature and `OPENAI_API_KEY` is set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: u32,
    pub batch_size: u32,
}

impl EmbeddingConfig {
    fn defaults() -> Self {
        Self { model: "text-embedding-3-small".to_string(), dimensions: 1536, batch_size: 64 }
    }
}

/// Retry configuration for a specific target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}
