use async_trait::async_trait;
use eatc_common::types::EvidenceItem;
use serde_json::json;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// Tavily AI search, paid-search tier, 0.2-1 RPS token bucket.
/// POST-only API, credential-gated.
pub struct Tavily;

#[async_trait]
impl Search for Tavily {
    fn name(&self) -> &'static str {
        "tavily"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        1.0
    }

    fn required_credential(&self) -> Option<&'static str> {
        Some("TAVILY_API_KEY")
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let Some(api_key) = &ctx.credentials.tavily_api_key else {
            return Vec::new();
        };
        let body = json!({
            "api_key": api_key,
            "query": query,
            "max_results": limit,
            "search_depth": "basic",
        });

        let outcome = match ctx.http.post_json("https://api.tavily.com/search", &body, &[], ctx.deadline).await {
            Ok(o) if o.status == 200 => o,
            Ok(o) => {
                tracing::debug!(provider = self.name(), status = o.status, "tavily search failed");
                ctx.note_status(o.status);
                return Vec::new();
            }
            Err(_) => {
                tracing::debug!(provider = self.name(), "tavily search failed");
                return Vec::new();
            }
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&outcome.body) else {
            return Vec::new();
        };
        let Some(results) = value["results"].as_array() else {
            return Vec::new();
        };

        results
            .iter()
            .take(limit)
            .filter_map(|r| {
                let title = r["title"].as_str()?;
                let url = r["url"].as_str()?;
                let mut item = make_item(self.name(), self.licensing(), url, title, r["content"].as_str());
                if let Some(score) = r["score"].as_f64() {
                    item.relevance_score = Some(score.clamp(0.0, 1.0));
                }
                Some(item)
            })
            .collect()
    }
}
