use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Per-host "next earliest request time" throttle.
///
/// A request for a host sleeps until that host's earliest time, then
/// advances it to `now + min_interval(host)`. A single-default-rate
/// token bucket widened into a next-available-instant map with per-host
/// interval overrides, since several upstreams (SEC, arXiv,
/// Overpass/Nominatim) require stricter pacing than the 0.8s default.
pub struct HostThrottle {
    next_available: Mutex<HashMap<String, Instant>>,
    overrides: HashMap<String, Duration>,
    default_interval: Duration,
}

impl HostThrottle {
    pub fn new(default_interval_secs: f64) -> Self {
        Self {
            next_available: Mutex::new(HashMap::new()),
            overrides: HashMap::new(),
            default_interval: Duration::from_secs_f64(default_interval_secs),
        }
    }

    pub fn with_override(mut self, host: impl Into<String>, interval_secs: f64) -> Self {
        self.overrides.insert(host.into(), Duration::from_secs_f64(interval_secs));
        self
    }

    fn min_interval(&self, host: &str) -> Duration {
        self.overrides.get(host).copied().unwrap_or(self.default_interval)
    }

    /// Wait until this host's throttle window has elapsed, then reserve the
    /// next window.
    pub async fn acquire(&self, host: &str) {
        let interval = self.min_interval(host);
        let wait = {
            let mut map = self.next_available.lock().await;
            let now = Instant::now();
            let earliest = map.get(host).copied().unwrap_or(now);
            let start_at = earliest.max(now);
            map.insert(host.to_string(), start_at + interval);
            start_at.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Default per-host throttle overrides named in spec §4.1 (arXiv >= 3s,
/// Overpass/Nominatim at 1 RPS, SEC's EDGAR fair-access policy).
pub fn default_overrides() -> Vec<(&'static str, f64)> {
    vec![
        ("export.arxiv.org", 3.0),
        ("overpass-api.de", 1.0),
        ("nominatim.openstreetmap.org", 1.0),
        ("www.sec.gov", 0.5),
        ("data.sec.gov", 0.5),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn serializes_requests_to_same_host() {
        let throttle = HostThrottle::new(0.05);
        let start = Instant::now();
        throttle.acquire("example.com").await;
        throttle.acquire("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn independent_hosts_do_not_block_each_other() {
        let throttle = HostThrottle::new(1.0);
        throttle.acquire("a.example.com").await;
        let start = Instant::now();
        throttle.acquire("b.example.com").await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
