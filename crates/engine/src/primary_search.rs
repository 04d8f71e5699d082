//! Wires the primary-source enricher's two capability traits
//! (`eatc_triangulate::{PrimarySearch, PrimaryExtract}`) onto the provider
//! fan-out and content fetcher, reusing the same scheduler/adapter
//! plumbing `pipeline.rs` uses for the main fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use eatc_common::config::Credentials;
use eatc_common::types::EvidenceItem;
use eatc_http::{Deadline, HttpClient};
use eatc_providers::{ProviderContext, Search};
use eatc_triangulate::{PrimaryExtract, PrimarySearch};

/// A `site:`-scoped query is just a plain search through whichever
/// credentialed web-search adapter is available; falls back to Wikipedia
/// (which ignores `site:` but still often surfaces the right page for
/// encyclopedic primary-source names) when no paid key is configured.
pub struct AdapterPrimarySearch {
    pub adapters: HashMap<&'static str, Arc<dyn Search>>,
    pub search_provider: &'static str,
    pub http: Arc<HttpClient>,
    pub credentials: Arc<Credentials>,
    pub deadline: Deadline,
}

#[async_trait]
impl PrimarySearch for AdapterPrimarySearch {
    async fn search(&self, query: &str, limit: usize) -> Vec<(String, String)> {
        let Some(adapter) = self.adapters.get(self.search_provider) else {
            return Vec::new();
        };
        let rate_limited = std::sync::atomic::AtomicBool::new(false);
        let ctx = ProviderContext { http: &self.http, deadline: self.deadline, credentials: &self.credentials, rate_limited: &rate_limited };
        adapter.search(query, limit, &ctx).await.into_iter().map(|item| (item.url, item.title)).collect()
    }
}

/// Fetches and extracts a primary-source search hit into a full
/// `EvidenceItem`, matching the same content-fetch path used for every
/// other item so primary-fill additions get the same quote extraction
/// and paywall resolution.
pub struct HttpPrimaryExtract {
    pub http: Arc<HttpClient>,
    pub credentials: Arc<Credentials>,
    pub max_pdf_pages: usize,
    pub deadline: Deadline,
}

#[async_trait]
impl PrimaryExtract for HttpPrimaryExtract {
    async fn extract(&self, url: &str, title: &str) -> Option<EvidenceItem> {
        let canonical = eatc_normalize::canonicalize_url(url);
        let content = eatc_normalize::fetch_and_extract(&self.http, &canonical, &self.credentials, self.max_pdf_pages, self.deadline).await;
        if content.fetch_failed || content.text.trim().is_empty() {
            return None;
        }
        let domain = eatc_common::domain::canonical_domain(
            url::Url::parse(&canonical).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_default().as_str(),
        );
        let snippet = content.quote.clone().unwrap_or_else(|| content.text.chars().take(500).collect());
        let mut item = EvidenceItem::new(canonical, content.title.unwrap_or_else(|| title.to_string()), Some(snippet), "primary-fill".to_string(), domain);
        item.quote_span = content.quote;
        Some(item)
    }
}
