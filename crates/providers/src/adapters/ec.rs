use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// European Commission publications/press-release search, 3 RPS (spec
/// §4.2). Distinct upstream endpoint from [`super::eurostat::Eurostat`]
/// even though both canonicalize to `ec.europa.eu`.
pub struct Ec;

#[async_trait]
impl Search for Ec {
    fn name(&self) -> &'static str {
        "ec"
    }

    fn licensing(&self) -> &'static str {
        "CC BY-4.0"
    }

    fn min_interval_secs(&self) -> f64 {
        0.33
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!("https://ec.europa.eu/search/?queryText={encoded}&format=json&pageSize={limit}");

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
                let url = r["url"].as_str().unwrap_or("https://ec.europa.eu/");
                let mut item = make_item(self.name(), self.licensing(), url, title, r["snippet"].as_str());
                item.is_primary_source = true;
                Some(item)
            })
            .collect()
    }
}
