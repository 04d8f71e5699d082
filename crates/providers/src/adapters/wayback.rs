use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::make_item;
use crate::trait_def::{ProviderContext, Search};

/// Wayback Machine CDX lookup — used as a last-resort source of
/// archived snapshots when the live page is blocked or gone, and as the
/// encyclopedia-tier fallback when no providers are credentialed (spec
/// §4.3).
pub struct Wayback;

#[async_trait]
impl Search for Wayback {
    fn name(&self) -> &'static str {
        "wayback"
    }

    fn licensing(&self) -> &'static str {
        "Public Domain/OA where applicable"
    }

    fn min_interval_secs(&self) -> f64 {
        0.3
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!(
            "https://web.archive.org/cdx/search/cdx?url={encoded}&output=json&limit={limit}&filter=statuscode:200&collapse=urlkey"
        );

        let Some(value) = crate::support::fetch_json(ctx, self.name(), &url, &[]).await else {
            return Vec::new();
        };
        let Some(rows) = value.as_array() else {
            return Vec::new();
        };

        rows.iter()
            .skip(1) // first row is the CDX header
            .take(limit)
            .filter_map(|row| {
                let row = row.as_array()?;
                let timestamp = row.get(1)?.as_str()?;
                let original = row.get(2)?.as_str()?;
                let snapshot_url = format!("https://web.archive.org/web/{timestamp}/{original}");
                Some(make_item(self.name(), self.licensing(), &snapshot_url, original, None))
            })
            .collect()
    }
}
