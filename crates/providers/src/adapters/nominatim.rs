use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// Nominatim geocoding search, 1 RPS hard limit.
pub struct Nominatim;

#[async_trait]
impl Search for Nominatim {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    fn licensing(&self) -> &'static str {
        "ODbL 1.0"
    }

    fn min_interval_secs(&self) -> f64 {
        1.0
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!("https://nominatim.openstreetmap.org/search?q={encoded}&format=jsonv2&limit={limit}");

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(results) = value.as_array() else {
            return Vec::new();
        };

        results
            .iter()
            .take(limit)
            .filter_map(|r| {
                let display_name = r["display_name"].as_str()?;
                let osm_type = r["osm_type"].as_str().unwrap_or("node");
                let osm_id = r["osm_id"].as_i64()?;
                let page_url = format!("https://www.openstreetmap.org/{osm_type}/{osm_id}");
                Some(make_item(self.name(), self.licensing(), &page_url, display_name, None))
            })
            .collect()
    }
}
