use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// OpenStreetMap Overpass API, 1 RPS hard limit. Used
/// for the `local` intent to find named features matching the query
/// (shops, landmarks, amenities) via a generic name-tag search.
pub struct Overpass;

#[async_trait]
impl Search for Overpass {
    fn name(&self) -> &'static str {
        "overpass"
    }

    fn licensing(&self) -> &'static str {
        "ODbL 1.0"
    }

    fn min_interval_secs(&self) -> f64 {
        1.0
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let escaped = query.replace('"', "\\\"");
        let ql = format!(
            "[out:json][timeout:25];nwr[\"name\"~\"{escaped}\",i];out center {limit};"
        );
        let encoded = urlencoding::encode(&ql);
        let url = format!("https://overpass-api.de/api/interpreter?data={encoded}");

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(elements) = value["elements"].as_array() else {
            return Vec::new();
        };

        elements
            .iter()
            .take(limit)
            .filter_map(|el| {
                let name = el["tags"]["name"].as_str()?;
                let id = el["id"].as_i64()?;
                let kind = el["type"].as_str().unwrap_or("node");
                let page_url = format!("https://www.openstreetmap.org/{kind}/{id}");
                Some(make_item(self.name(), self.licensing(), &page_url, name, None))
            })
            .collect()
    }
}
