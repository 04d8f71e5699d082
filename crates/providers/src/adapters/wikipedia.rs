use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// Wikipedia full-text search (courtesy-only tier, 2-5 RPS per spec §4.2).
pub struct Wikipedia;

#[async_trait]
impl Search for Wikipedia {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn licensing(&self) -> &'static str {
        "CC BY-SA 3.0"
    }

    fn min_interval_secs(&self) -> f64 {
        0.3
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!(
            "https://en.wikipedia.org/w/api.php?action=query&list=search&srsearch={encoded}&srlimit={limit}&format=json"
        );

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(results) = value["query"]["search"].as_array() else {
            return Vec::new();
        };

        results
            .iter()
            .take(limit)
            .filter_map(|r| {
                let title = r["title"].as_str()?;
                let snippet = r["snippet"].as_str().map(strip_wiki_markup);
                let page_url = format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_"));
                let mut item = make_item(self.name(), self.licensing(), &page_url, title, snippet.as_deref());
                item.metadata.insert("wordcount".into(), r["wordcount"].clone());
                Some(item)
            })
            .collect()
    }
}

fn strip_wiki_markup(s: &str) -> String {
    s.replace("<span class=\"searchmatch\">", "").replace("</span>", "")
}
