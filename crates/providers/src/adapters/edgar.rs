use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// SEC EDGAR full-text search. `sec.gov` requires a User-Agent carrying
/// operator identity and `Accept-Encoding: identity` — handled by the HTTP
/// substrate's per-domain overrides, plus a stricter host throttle
/// interval.
pub struct Edgar;

#[async_trait]
impl Search for Edgar {
    fn name(&self) -> &'static str {
        "edgar"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        0.5
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!("https://efts.sec.gov/LATEST/search-index?q={encoded}&forms=&hits={limit}");

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(hits) = value["hits"]["hits"].as_array() else {
            return Vec::new();
        };

        hits.iter()
            .take(limit)
            .filter_map(|h| {
                let source = &h["_source"];
                let title = source["display_names"][0].as_str().or_else(|| source["form"].as_str())?;
                let accession = h["_id"].as_str()?;
                let page_url = format!("https://www.sec.gov/cgi-bin/browse-edgar?action=getcompany&filing={accession}");
                let mut item = make_item(self.name(), self.licensing(), &page_url, title, None);
                item.is_primary_source = true;
                Some(item)
            })
            .collect()
    }
}
