use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// OECD iLibrary search, 3 RPS. OECD's SDMX data endpoints
/// require `Accept: application/json` — handled by the HTTP substrate's
/// per-domain header overrides, not here.
pub struct Oecd;

#[async_trait]
impl Search for Oecd {
    fn name(&self) -> &'static str {
        "oecd"
    }

    fn licensing(&self) -> &'static str {
        "CC BY-4.0"
    }

    fn min_interval_secs(&self) -> f64 {
        0.33
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!(
            "https://www.oecd-ilibrary.org/search?value1={encoded}&option1=quicksearch&format=json&pageSize={limit}"
        );

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
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
                let url = r["url"].as_str().unwrap_or("https://www.oecd-ilibrary.org/");
                let mut item = make_item(self.name(), self.licensing(), url, title, r["snippet"].as_str());
                item.is_primary_source = true;
                Some(item)
            })
            .collect()
    }
}
