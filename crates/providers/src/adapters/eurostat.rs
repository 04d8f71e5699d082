use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// Eurostat statistics search, 3 RPS. Canonicalizes under
/// `ec.europa.eu` via [`eatc_common::domain::canonical_domain`]'s alias
/// table, same authority family as the European Commission adapter.
pub struct Eurostat;

#[async_trait]
impl Search for Eurostat {
    fn name(&self) -> &'static str {
        "eurostat"
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
            "https://ec.europa.eu/eurostat/api/dissemination/catalogue/search?query={encoded}&format=json&limit={limit}"
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
                let url = r["url"].as_str().unwrap_or("https://ec.europa.eu/eurostat");
                let mut item = make_item(self.name(), self.licensing(), url, title, None);
                item.is_primary_source = true;
                Some(item)
            })
            .collect()
    }
}
