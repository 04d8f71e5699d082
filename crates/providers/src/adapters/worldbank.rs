use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// World Bank Documents & Reports full-text search, 10 RPS.
/// A primary source for the `stats` and `travel` intents (spec §6 trusted
/// domains; §8 scenario S1).
pub struct WorldBank;

#[async_trait]
impl Search for WorldBank {
    fn name(&self) -> &'static str {
        "worldbank"
    }

    fn licensing(&self) -> &'static str {
        "CC BY-4.0"
    }

    fn min_interval_secs(&self) -> f64 {
        0.1
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!(
            "https://search.worldbank.org/api/v2/wds?format=json&qterm={encoded}&rows={limit}"
        );

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(documents) = value["documents"].as_object() else {
            return Vec::new();
        };

        documents
            .values()
            .filter(|d| d.is_object())
            .take(limit)
            .filter_map(|d| {
                let title = d["display_title"].as_str().or_else(|| d["docty"].as_str())?;
                let url = d["pdfurl"].as_str().or_else(|| d["url"].as_str())?;
                let mut item = make_item(self.name(), self.licensing(), url, title, None);
                item.is_primary_source = true;
                Some(item)
            })
            .collect()
    }
}
