use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// Unpaywall open-access search. Requires `UNPAYWALL_EMAIL`.
/// The single-DOI open-access lookup used by the paywall resolver is
/// a separate, narrower call against the same host — see
/// `eatc-normalize::paywall::lookup_oa_location`, which does not go
/// through this `search` entry point.
pub struct Unpaywall;

#[async_trait]
impl Search for Unpaywall {
    fn name(&self) -> &'static str {
        "unpaywall"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        0.5
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let Some(email) = &ctx.credentials.unpaywall_email else {
            return Vec::new();
        };
        let encoded = urlencoding::encode(query);
        let url = format!("https://api.unpaywall.org/v2/search?query={encoded}&email={email}");

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
                let response = &r["response"];
                let doi = response["doi"].as_str()?;
                let title = response["title"].as_str().unwrap_or(doi);
                let oa_url = response["best_oa_location"]["url"].as_str().unwrap_or(doi);
                let mut item = make_item(self.name(), self.licensing(), oa_url, title, None);
                item.doi = Some(doi.to_string());
                Some(item)
            })
            .collect()
    }
}
