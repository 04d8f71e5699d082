use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// PubMed E-utilities search, 3 RPS. Demonstrates the
/// "conservative query degradation" pattern (§4.2): on HTTP 400 the esearch
/// call is retried with a narrower `[title]` field tag, then
/// `[title/abstract]`, before giving up — never propagating the 400.
pub struct PubMed;

impl PubMed {
    async fn esearch_ids(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<String> {
        let candidates = [
            format!("{query}"),
            format!("{query}[title]"),
            format!("{query}[title/abstract]"),
        ];

        for term in candidates {
            let encoded = urlencoding::encode(&term);
            let url = format!(
                "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi?db=pubmed&term={encoded}&retmax={limit}&retmode=json"
            );
            match ctx.http.get_text(&url, &[], ctx.deadline).await {
                Ok(outcome) if outcome.status == 200 => {
                    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&outcome.body) {
                        if let Some(ids) = value["esearchresult"]["idlist"].as_array() {
                            return ids.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                        }
                    }
                    return Vec::new();
                }
                Ok(outcome) if outcome.status == 400 => continue, // narrow and retry
                Ok(outcome) => {
                    ctx.note_status(outcome.status);
                    return Vec::new();
                }
                Err(_) => return Vec::new(),
            }
        }
        Vec::new()
    }
}

#[async_trait]
impl Search for PubMed {
    fn name(&self) -> &'static str {
        "pubmed"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        0.34
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let ids = self.esearch_ids(query, limit, ctx).await;
        if ids.is_empty() {
            return Vec::new();
        }

        let id_list = ids.join(",");
        let url = format!(
            "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi?db=pubmed&id={id_list}&retmode=json"
        );
        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(result) = value["result"].as_object() else {
            return Vec::new();
        };

        ids.iter()
            .filter_map(|id| {
                let entry = result.get(id)?;
                let title = entry["title"].as_str()?;
                let page_url = format!("https://pubmed.ncbi.nlm.nih.gov/{id}/");
                let mut item = make_item(self.name(), self.licensing(), &page_url, title, None);
                item.pmid = Some(id.clone());
                Some(item)
            })
            .collect()
    }
}
