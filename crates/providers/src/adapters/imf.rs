use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// IMF publications search, 3 RPS.
pub struct Imf;

#[async_trait]
impl Search for Imf {
    fn name(&self) -> &'static str {
        "imf"
    }

    fn licensing(&self) -> &'static str {
        "CC BY-4.0"
    }

    fn min_interval_secs(&self) -> f64 {
        0.33
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!("https://www.imf.org/external/search/searchrslt.aspx?format=json&q={encoded}&rows={limit}");

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
                let url = r["url"].as_str().unwrap_or("https://www.imf.org/");
                let mut item = make_item(self.name(), self.licensing(), url, title, r["summary"].as_str());
                item.is_primary_source = true;
                Some(item)
            })
            .collect()
    }
}
