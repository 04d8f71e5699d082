use async_trait::async_trait;
use eatc_common::types::EvidenceItem;
use serde_json::json;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// Serper.dev Google SERP search, paid-search tier. POST-only,
/// API key sent as a header rather than in the body.
pub struct Serper;

#[async_trait]
impl Search for Serper {
    fn name(&self) -> &'static str {
        "serper"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        1.0
    }

    fn required_credential(&self) -> Option<&'static str> {
        Some("SERPER_API_KEY")
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let Some(api_key) = &ctx.credentials.serper_api_key else {
            return Vec::new();
        };
        let body = json!({ "q": query, "num": limit });

        let outcome = match ctx
            .http
            .post_json(
                "https://google.serper.dev/search",
                &body,
                &[("X-API-KEY", api_key.as_str()), ("Content-Type", "application/json")],
                ctx.deadline,
            )
            .await
        {
            Ok(o) if o.status == 200 => o,
            Ok(o) => {
                ctx.note_status(o.status);
                return Vec::new();
            }
            Err(_) => return Vec::new(),
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&outcome.body) else {
            return Vec::new();
        };
        let Some(organic) = value["organic"].as_array() else {
            return Vec::new();
        };

        organic
            .iter()
            .take(limit)
            .filter_map(|r| {
                let title = r["title"].as_str()?;
                let url = r["link"].as_str()?;
                Some(make_item(self.name(), self.licensing(), url, title, r["snippet"].as_str()))
            })
            .collect()
    }
}
