use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::{make_item, parse_loose_date};
use crate::trait_def::{ProviderContext, Search};

/// OpenAlex scholarly works search. 10 RPS / 100k daily;
/// `mailto` appended per OpenAlex's polite-pool convention when a contact
/// email is configured.
pub struct OpenAlex;

#[async_trait]
impl Search for OpenAlex {
    fn name(&self) -> &'static str {
        "openalex"
    }

    fn licensing(&self) -> &'static str {
        "CC0"
    }

    fn min_interval_secs(&self) -> f64 {
        0.1
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let mailto = ctx
            .credentials
            .contact_email
            .as_deref()
            .map(|e| format!("&mailto={}", urlencoding::encode(e)))
            .unwrap_or_default();
        let url = format!("https://api.openalex.org/works?search={encoded}&per_page={limit}{mailto}");

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(results) = value["results"].as_array() else {
            return Vec::new();
        };

        results
            .iter()
            .take(limit)
            .filter_map(|w| {
                let id = w["id"].as_str()?;
                let title = w["display_name"].as_str().or_else(|| w["title"].as_str())?;
                let landing = w["primary_location"]["landing_page_url"].as_str().unwrap_or(id);
                let mut item = make_item(self.name(), self.licensing(), landing, title, None);
                if let Some(doi) = w["doi"].as_str() {
                    item.doi = Some(doi.trim_start_matches("https://doi.org/").to_string());
                }
                if let Some(date) = w["publication_date"].as_str() {
                    item.date = parse_loose_date(date);
                }
                item.is_primary_source = w["type"].as_str() == Some("article")
                    && w["primary_location"]["source"]["is_oa"].as_bool().unwrap_or(false);
                Some(item)
            })
            .collect()
    }
}
