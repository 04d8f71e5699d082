use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// FRED (Federal Reserve Economic Data) series search. Requires
/// `FRED_API_KEY`; the router only selects this adapter when the key is
/// present (spec §4.3: "Paid-search providers are only selected when keys
/// are present" — FRED follows the same credential-gating discipline even
/// though it is free, since it still requires a registered key).
pub struct Fred;

#[async_trait]
impl Search for Fred {
    fn name(&self) -> &'static str {
        "fred"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        0.5
    }

    fn required_credential(&self) -> Option<&'static str> {
        Some("FRED_API_KEY")
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let Some(api_key) = &ctx.credentials.fred_api_key else {
            return Vec::new();
        };
        let encoded = urlencoding::encode(query);
        let url = format!(
            "https://api.stlouisfed.org/fred/series/search?search_text={encoded}&api_key={api_key}&file_type=json&limit={limit}"
        );

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(series) = value["seriess"].as_array() else {
            return Vec::new();
        };

        series
            .iter()
            .take(limit)
            .filter_map(|s| {
                let id = s["id"].as_str()?;
                let title = s["title"].as_str().unwrap_or(id);
                let page_url = format!("https://fred.stlouisfed.org/series/{id}");
                let mut item = make_item(self.name(), self.licensing(), &page_url, title, s["notes"].as_str());
                item.is_primary_source = true;
                Some(item)
            })
            .collect()
    }
}
