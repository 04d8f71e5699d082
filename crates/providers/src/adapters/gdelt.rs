use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::{make_item, parse_loose_date};
use crate::trait_def::{ProviderContext, Search};

/// GDELT 2.0 Doc API — global news monitoring, used for the `news` intent.
pub struct Gdelt;

#[async_trait]
impl Search for Gdelt {
    fn name(&self) -> &'static str {
        "gdelt"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        0.5
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!(
            "https://api.gdeltproject.org/api/v2/doc/doc?query={encoded}&format=json&maxrecords={limit}&mode=artlist"
        );

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(articles) = value["articles"].as_array() else {
            return Vec::new();
        };

        articles
            .iter()
            .take(limit)
            .filter_map(|a| {
                let title = a["title"].as_str()?;
                let url = a["url"].as_str()?;
                let mut item = make_item(self.name(), self.licensing(), url, title, None);
                if let Some(date) = a["seendate"].as_str() {
                    item.date = parse_loose_date(date);
                }
                Some(item)
            })
            .collect()
    }
}
