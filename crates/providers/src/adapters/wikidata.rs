use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// Wikidata entity search (courtesy-only tier).
pub struct Wikidata;

#[async_trait]
impl Search for Wikidata {
    fn name(&self) -> &'static str {
        "wikidata"
    }

    fn licensing(&self) -> &'static str {
        "CC0"
    }

    fn min_interval_secs(&self) -> f64 {
        0.3
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!(
            "https://www.wikidata.org/w/api.php?action=wbsearchentities&search={encoded}&language=en&limit={limit}&format=json"
        );

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(results) = value["search"].as_array() else {
            return Vec::new();
        };

        results
            .iter()
            .take(limit)
            .filter_map(|r| {
                let id = r["id"].as_str()?;
                let label = r["label"].as_str().unwrap_or(id);
                let description = r["description"].as_str();
                let page_url = format!("https://www.wikidata.org/wiki/{id}");
                Some(make_item(self.name(), self.licensing(), &page_url, label, description))
            })
            .collect()
    }
}
