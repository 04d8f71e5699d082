use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

/// Cached response body plus the revalidation metadata needed to send a
/// conditional request next time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub body: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub cache_control: Option<String>,
    pub stored_at_epoch_secs: u64,
}

struct MemEntry {
    entry: CacheEntry,
    inserted_at: Instant,
}

/// Two-level response cache: an in-memory TTL layer (hot) wrapping an
/// on-disk layer (cold), keyed by `sha256(method || "\0" || url)`.
///
/// Widens a pure in-memory TTL cache into one with an on-disk layer:
/// entries survive process restarts and carry ETag/Last-Modified so a
/// cache hit can still issue a conditional GET when its TTL has lapsed
/// but the disk copy might still be valid.
pub struct ResponseCache {
    mem: Mutex<HashMap<String, MemEntry>>,
    ttl: Duration,
    root: PathBuf,
}

impl ResponseCache {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            mem: Mutex::new(HashMap::new()),
            ttl,
            root: root.into(),
        }
    }

    fn key(method: &str, url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b"\0");
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn shard_path(&self, key: &str) -> PathBuf {
        let (prefix, _) = key.split_at(2.min(key.len()));
        self.root.join(prefix).join(format!("{key}.json"))
    }

    pub async fn get(&self, method: &str, url: &str) -> Option<CacheEntry> {
        let key = Self::key(method, url);

        {
            let mem = self.mem.lock().await;
            if let Some(e) = mem.get(&key) {
                if e.inserted_at.elapsed() < self.ttl {
                    metrics::counter!("http.cache.hit", "layer" => "mem").increment(1);
                    return Some(e.entry.clone());
                }
            }
        }

        let path = self.shard_path(&key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                Ok(entry) => {
                    metrics::counter!("http.cache.hit", "layer" => "disk").increment(1);
                    let mut mem = self.mem.lock().await;
                    mem.insert(
                        key,
                        MemEntry {
                            entry: entry.clone(),
                            inserted_at: Instant::now(),
                        },
                    );
                    Some(entry)
                }
                Err(_) => None,
            },
            Err(_) => {
                metrics::counter!("http.cache.miss").increment(1);
                None
            }
        }
    }

    /// Bump a cached entry's `stored_at_epoch_secs` to now without
    /// touching its body, used after a 304 revalidation confirms the
    /// cached body is still current.
    pub async fn touch(&self, method: &str, url: &str, entry: &CacheEntry) {
        let mut refreshed = entry.clone();
        refreshed.stored_at_epoch_secs = chrono::Utc::now().timestamp() as u64;
        self.put(method, url, refreshed).await;
    }

    pub async fn put(&self, method: &str, url: &str, entry: CacheEntry) {
        let key = Self::key(method, url);
        let path = self.shard_path(&key);

        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Ok(bytes) = serde_json::to_vec(&entry) {
            let tmp_path = path.with_extension("json.tmp");
            if tokio::fs::write(&tmp_path, &bytes).await.is_ok() {
                let _ = tokio::fs::rename(&tmp_path, &path).await;
            }
        }

        let mut mem = self.mem.lock().await;
        mem.retain(|_, e| e.inserted_at.elapsed() < self.ttl);
        mem.insert(
            key,
            MemEntry {
                entry,
                inserted_at: Instant::now(),
            },
        );
    }
}

/// Parse a `Cache-Control` header's `max-age` directive, capping it at
/// 1800s and defaulting to 900s when absent — matching the original
/// research system's cache policy.
pub fn parse_cache_control(header: Option<&str>) -> u64 {
    const DEFAULT_TTL: u64 = 900;
    const MAX_TTL: u64 = 1800;

    let Some(header) = header else { return DEFAULT_TTL };
    for directive in header.split(',') {
        let directive = directive.trim();
        if let Some(rest) = directive.strip_prefix("max-age=") {
            if let Ok(secs) = rest.trim().parse::<u64>() {
                return secs.min(MAX_TTL);
            }
        }
        if directive.eq_ignore_ascii_case("no-store") || directive.eq_ignore_ascii_case("no-cache") {
            return 0;
        }
    }
    DEFAULT_TTL
}

#[allow(dead_code)]
fn shard_root(base: &Path) -> PathBuf {
    base.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_disk_layer() {
        let dir = std::env::temp_dir().join(format!("eatc-http-cache-test-{}", std::process::id()));
        let cache = ResponseCache::new(&dir, Duration::from_millis(10));

        cache
            .put(
                "GET",
                "https://example.com/a",
                CacheEntry {
                    body: "hello".into(),
                    status_code: 200,
                    content_type: Some("text/html".into()),
                    etag: Some("abc".into()),
                    last_modified: None,
                    cache_control: None,
                    stored_at_epoch_secs: 0,
                },
            )
            .await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        let hit = cache.get("GET", "https://example.com/a").await;
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().body, "hello");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn caps_cache_control_ttl() {
        assert_eq!(parse_cache_control(Some("max-age=7200")), 1800);
        assert_eq!(parse_cache_control(Some("max-age=60")), 60);
        assert_eq!(parse_cache_control(None), 900);
        assert_eq!(parse_cache_control(Some("no-store")), 0);
    }
}
