use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// Brave Search API, paid-search tier. GET with a subscription
/// token header rather than a query-string key.
pub struct Brave;

#[async_trait]
impl Search for Brave {
    fn name(&self) -> &'static str {
        "brave"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        1.0
    }

    fn required_credential(&self) -> Option<&'static str> {
        Some("BRAVE_API_KEY")
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let Some(api_key) = &ctx.credentials.brave_api_key else {
            return Vec::new();
        };
        let encoded = urlencoding::encode(query);
        let url = format!("https://api.search.brave.com/res/v1/web/search?q={encoded}&count={limit}");

        let outcome = match ctx
            .http
            .get_text(&url, &[("X-Subscription-Token", api_key.as_str())], ctx.deadline)
            .await
        {
            Ok(o) if o.status == 200 => o,
            Ok(o) => {
                ctx.note_status(o.status);
                return Vec::new();
            }
            Err(_) => return Vec::new(),
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&outcome.body) else {
            return Vec::new();
        };
        let Some(results) = value["web"]["results"].as_array() else {
            return Vec::new();
        };

        results
            .iter()
            .take(limit)
            .filter_map(|r| {
                let title = r["title"].as_str()?;
                let url = r["url"].as_str()?;
                Some(make_item(self.name(), self.licensing(), url, title, r["description"].as_str()))
            })
            .collect()
    }
}
