use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::{make_item, parse_loose_date};
use crate::trait_def::{ProviderContext, Search};

/// Crossref DOI metadata search, 5 RPS. Also the backing
/// lookup for the paywall resolver's DOI-metadata step — that call
/// goes through [`crate::support::fetch_json`] directly rather than this
/// `search` entry point, since it looks up one known DOI rather than
/// running a free-text query.
pub struct Crossref;

#[async_trait]
impl Search for Crossref {
    fn name(&self) -> &'static str {
        "crossref"
    }

    fn licensing(&self) -> &'static str {
        "CC0"
    }

    fn min_interval_secs(&self) -> f64 {
        0.2
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let mailto = ctx
            .credentials
            .contact_email
            .as_deref()
            .map(|e| format!("&mailto={}", urlencoding::encode(e)))
            .unwrap_or_default();
        let url = format!("https://api.crossref.org/works?query={encoded}&rows={limit}{mailto}");

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(items) = value["message"]["items"].as_array() else {
            return Vec::new();
        };

        items
            .iter()
            .take(limit)
            .filter_map(|w| {
                let doi = w["DOI"].as_str()?;
                let title = w["title"].as_array().and_then(|a| a[0].as_str()).unwrap_or(doi);
                let url = w["URL"].as_str().unwrap_or(doi);
                let mut item = make_item(self.name(), self.licensing(), url, title, None);
                item.doi = Some(doi.to_string());
                if let Some(parts) = w["published"]["date-parts"][0].as_array() {
                    let ymd: Vec<String> = parts.iter().filter_map(|p| p.as_i64()).map(|p| p.to_string()).collect();
                    if !ymd.is_empty() {
                        item.date = parse_loose_date(&ymd.join("-"));
                    }
                }
                Some(item)
            })
            .collect()
    }
}
