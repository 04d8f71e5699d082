use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::{HttpError, Result};

const CHUNK_LOG_INTERVAL_BYTES: u64 = 1024 * 1024;

/// Streaming PDF downloader with a HEAD-gate size check, a hard streaming
/// cap enforced byte-by-byte, exponential backoff retry, and content-hash
/// dedup across redirect chains — ported from the original research
/// system's `net/pdf_fetch.py::download_pdf`.
pub struct PdfFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    retries: u32,
    url_to_hash: Mutex<HashMap<String, String>>,
    seen: Mutex<HashMap<String, Bytes>>,
}

impl PdfFetcher {
    pub fn new(client: reqwest::Client, max_mb: f64, retries: u32) -> Self {
        Self {
            client,
            max_bytes: (max_mb * 1024.0 * 1024.0) as u64,
            retries,
            url_to_hash: Mutex::new(HashMap::new()),
            seen: Mutex::new(HashMap::new()),
        }
    }

    fn canonicalize(url: &str) -> String {
        match url::Url::parse(url) {
            Ok(mut u) => {
                u.set_fragment(None);
                let mut pairs: Vec<(String, String)> = u.query_pairs().into_owned().collect();
                pairs.sort();
                let query = if pairs.is_empty() {
                    None
                } else {
                    Some(
                        pairs
                            .into_iter()
                            .map(|(k, v)| format!("{k}={v}"))
                            .collect::<Vec<_>>()
                            .join("&"),
                    )
                };
                u.set_query(query.as_deref());
                u.as_str().to_lowercase()
            }
            Err(_) => url.to_lowercase(),
        }
    }

    fn content_hash(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Fetch a PDF's bytes, enforcing the size cap and retrying transient
    /// failures. Returns a cached copy if this exact canonical URL (or one
    /// previously observed to redirect to the same content) was already
    /// downloaded this run.
    pub async fn fetch(&self, url: &str) -> Result<Bytes> {
        let canonical = Self::canonicalize(url);
        if let Some(hash) = self.url_to_hash.lock().await.get(&canonical).cloned() {
            if let Some(bytes) = self.seen.lock().await.get(&hash).cloned() {
                return Ok(bytes);
            }
        }

        if let Ok(head) = self.client.head(url).send().await {
            if let Some(len) = head.content_length() {
                if len > self.max_bytes {
                    return Err(HttpError::TooLarge(len));
                }
            }
        }

        let mut delay = Duration::ZERO;
        let mut last_err = None;
        for attempt in 0..=self.retries {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match self.try_download(url, &canonical).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    last_err = Some(e);
                    delay = if attempt == 0 {
                        Duration::from_millis(350)
                    } else {
                        (delay * 2).min(Duration::from_secs(2))
                    };
                }
            }
        }
        Err(last_err.unwrap_or_else(|| HttpError::Request("pdf fetch exhausted retries".into())))
    }

    async fn try_download(&self, url: &str, canonical: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(HttpError::Request(format!("status {}", response.status())));
        }

        let final_url = response.url().to_string();
        let mut buf: Vec<u8> = Vec::new();
        let mut size: u64 = 0;
        let mut next_log = CHUNK_LOG_INTERVAL_BYTES;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            if size > self.max_bytes {
                return Err(HttpError::TooLarge(size));
            }
            if size > next_log {
                tracing::debug!(url, bytes = size, "pdf download progress");
                next_log += CHUNK_LOG_INTERVAL_BYTES;
            }
            buf.extend_from_slice(&chunk);
        }

        let bytes = Bytes::from(buf);
        let hash = Self::content_hash(&bytes);

        let mut seen = self.seen.lock().await;
        seen.insert(hash.clone(), bytes.clone());
        drop(seen);

        let mut url_to_hash = self.url_to_hash.lock().await;
        url_to_hash.insert(canonical.to_string(), hash.clone());
        if final_url != url {
            url_to_hash.insert(Self::canonicalize(&final_url), hash);
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_query_param_order() {
        let a = PdfFetcher::canonicalize("https://Example.com/doc.pdf?b=2&a=1");
        let b = PdfFetcher::canonicalize("https://example.com/doc.pdf?a=1&b=2");
        assert_eq!(a, b);
    }
}
