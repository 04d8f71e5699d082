use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::{make_item, parse_loose_date};
use crate::trait_def::{ProviderContext, Search};

/// Europe PMC full-text search, 5 RPS.
pub struct EuropePmc;

#[async_trait]
impl Search for EuropePmc {
    fn name(&self) -> &'static str {
        "europepmc"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        0.2
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!(
            "https://www.ebi.ac.uk/europepmc/webservices/rest/search?query={encoded}&format=json&pageSize={limit}"
        );

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(results) = value["resultList"]["result"].as_array() else {
            return Vec::new();
        };

        results
            .iter()
            .take(limit)
            .filter_map(|r| {
                let title = r["title"].as_str()?;
                let pmid = r["pmid"].as_str();
                let doi = r["doi"].as_str();
                let page_url = pmid
                    .map(|id| format!("https://europepmc.org/article/MED/{id}"))
                    .or_else(|| doi.map(|d| format!("https://doi.org/{d}")))?;
                let mut item = make_item(self.name(), self.licensing(), &page_url, title, r["abstractText"].as_str());
                item.pmid = pmid.map(str::to_string);
                item.doi = doi.map(str::to_string);
                if let Some(date) = r["firstPublicationDate"].as_str() {
                    item.date = parse_loose_date(date);
                }
                Some(item)
            })
            .collect()
    }
}
