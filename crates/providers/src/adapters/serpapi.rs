use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// SerpApi Google SERP search, paid-search tier. The
/// fallback-tier paid provider, selected after Tavily/Brave/Serper when
/// all three are unavailable or exhausted.
pub struct SerpApi;

#[async_trait]
impl Search for SerpApi {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        1.0
    }

    fn required_credential(&self) -> Option<&'static str> {
        Some("SERPAPI_API_KEY")
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let Some(api_key) = &ctx.credentials.serpapi_api_key else {
            return Vec::new();
        };
        let encoded = urlencoding::encode(query);
        let url = format!("https://serpapi.com/search?q={encoded}&num={limit}&api_key={api_key}&output=json");

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(results) = value["organic_results"].as_array() else {
            return Vec::new();
        };

        results
            .iter()
            .take(limit)
            .filter_map(|r| {
                let title = r["title"].as_str()?;
                let url = r["link"].as_str()?;
                Some(make_item(self.name(), self.licensing(), url, title, r["snippet"].as_str()))
            })
            .collect()
    }
}
