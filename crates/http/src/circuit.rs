use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — all calls pass through.
    Closed,
    /// Breaker tripped — calls are rejected.
    Open,
    /// Cooldown elapsed — one probe call allowed.
    HalfOpen,
}

/// A circuit breaker that opens after consecutive failures exceed a
/// threshold, and closes again after a successful probe during half-open.
pub struct CircuitBreaker {
    name: String,
    failure_count: AtomicU32,
    failure_threshold: u32,
    cooldown: Duration,
    /// Guards (state, last_failure_time). Uses std::sync::Mutex — never
    /// held across an await point.
    inner: Mutex<CircuitInner>,
}

struct CircuitInner {
    state: CircuitState,
    last_failure: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, cooldown_seconds: u64) -> Self {
        Self {
            name: name.into(),
            failure_count: AtomicU32::new(0),
            failure_threshold,
            cooldown: Duration::from_secs(cooldown_seconds),
            inner: Mutex::new(CircuitInner {
                state: CircuitState::Closed,
                last_failure: None,
            }),
        }
    }

    /// Check whether a call should be allowed.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if let Some(last) = inner.last_failure {
                    if last.elapsed() >= self.cooldown {
                        inner.state = CircuitState::HalfOpen;
                        tracing::info!(circuit = %self.name, "circuit breaker transitioning to half-open");
                        true
                    } else {
                        false
                    }
                } else {
                    inner.state = CircuitState::Closed;
                    true
                }
            }
            CircuitState::HalfOpen => true,
        }
    }

    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        let mut inner = self.inner.lock().unwrap();
        if inner.state != CircuitState::Closed {
            tracing::info!(circuit = %self.name, previous_state = ?inner.state, "circuit breaker closing after success");
            inner.state = CircuitState::Closed;
            metrics::counter!("circuit_breaker.recoveries", "circuit" => self.name.clone()).increment(1);
        }
    }

    pub fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut inner = self.inner.lock().unwrap();
        inner.last_failure = Some(Instant::now());

        if count >= self.failure_threshold && inner.state != CircuitState::Open {
            tracing::warn!(circuit = %self.name, failures = count, threshold = self.failure_threshold, "circuit breaker OPEN");
            inner.state = CircuitState::Open;
            metrics::counter!("circuit_breaker.trips", "circuit" => self.name.clone()).increment(1);
        }
    }

    pub fn current_state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registry of per-host/per-provider circuit breakers, created lazily on
/// first use. A fixed-field registry (one field per hard dependency)
/// widened to an open set keyed by name, since the provider set here is
/// ~20 hosts decided at runtime rather than a handful of fixed services
/// known at compile time.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, std::sync::Arc<CircuitBreaker>>,
    default_threshold: u32,
    default_cooldown_seconds: u64,
}

impl CircuitBreakerRegistry {
    pub fn new(default_threshold: u32, default_cooldown_seconds: u64) -> Self {
        Self {
            breakers: DashMap::new(),
            default_threshold,
            default_cooldown_seconds,
        }
    }

    pub fn get_or_create(&self, key: &str) -> std::sync::Arc<CircuitBreaker> {
        self.breakers
            .entry(key.to_string())
            .or_insert_with(|| {
                std::sync::Arc::new(CircuitBreaker::new(key, self.default_threshold, self.default_cooldown_seconds))
            })
            .clone()
    }

    /// Override the threshold/cooldown for one key (e.g. `OECD_CIRCUIT_THRESHOLD`).
    pub fn configure(&self, key: &str, threshold: u32, cooldown_seconds: u64) {
        self.breakers.insert(
            key.to_string(),
            std::sync::Arc::new(CircuitBreaker::new(key, threshold, cooldown_seconds)),
        );
    }

    pub fn allow(&self, key: &str) -> bool {
        self.get_or_create(key).allow()
    }

    pub fn record_success(&self, key: &str) {
        self.get_or_create(key).record_success();
    }

    pub fn record_failure(&self, key: &str) {
        self.get_or_create(key).record_failure();
    }

    pub fn report_metrics(&self) {
        for entry in self.breakers.iter() {
            let state_value = match entry.value().current_state() {
                CircuitState::Closed => 0.0,
                CircuitState::HalfOpen => 0.5,
                CircuitState::Open => 1.0,
            };
            metrics::gauge!("circuit_breaker.state", "circuit" => entry.key().clone()).set(state_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new("test", 3, 900);
        assert!(cb.allow());
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.current_state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.current_state(), CircuitState::Open);
        assert!(!cb.allow());
    }

    #[test]
    fn registry_tracks_independent_keys() {
        let reg = CircuitBreakerRegistry::new(3, 900);
        reg.record_failure("host-a");
        reg.record_failure("host-a");
        reg.record_failure("host-a");
        assert!(!reg.allow("host-a"));
        assert!(reg.allow("host-b"));
    }
}
