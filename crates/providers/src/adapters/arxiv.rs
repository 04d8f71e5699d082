use async_trait::async_trait;
use eatc_common::types::EvidenceItem;

use crate::support::{make_item, parse_loose_date};
use crate::trait_def::{ProviderContext, Search};

/// arXiv preprint search. The only adapter with a *hard* minimum interval
/// (spec §4.2 table: arXiv requires >=3s between requests, not merely a
/// courtesy default) and the only one whose upstream returns an Atom feed
/// rather than JSON.
pub struct Arxiv;

#[async_trait]
impl Search for Arxiv {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn licensing(&self) -> &'static str {
        "arXiv License"
    }

    fn min_interval_secs(&self) -> f64 {
        3.0
    }

    async fn search(&self, query: &str, limit: usize, ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        let encoded = urlencoding::encode(query);
        let url = format!("http://export.arxiv.org/api/query?search_query=all:{encoded}&max_results={limit}");

        let outcome = match ctx.http.get_text(&url, &[], ctx.deadline).await {
            Ok(o) if o.status == 200 => o,
            Ok(o) => {
                ctx.note_status(o.status);
                return Vec::new();
            }
            Err(_) => return Vec::new(),
        };

        parse_atom_entries(&outcome.body, self.name(), self.licensing())
    }
}

fn parse_atom_entries(body: &str, provider: &str, licensing: &str) -> Vec<EvidenceItem> {
    let Ok(doc) = roxmltree::Document::parse(body) else {
        return Vec::new();
    };

    doc.descendants()
        .filter(|n| n.has_tag_name("entry"))
        .filter_map(|entry| {
            let title = child_text(entry, "title")?;
            let id_url = child_text(entry, "id")?;
            let summary = child_text(entry, "summary");
            let published = child_text(entry, "published");

            let mut item = make_item(provider, licensing, &id_url, title.trim(), summary.as_deref().map(str::trim));
            if let Some(id) = id_url.rsplit('/').next() {
                item.arxiv_id = Some(id.to_string());
            }
            if let Some(date) = published {
                item.date = parse_loose_date(&date);
            }
            Some(item)
        })
        .collect()
}

fn child_text(node: roxmltree::Node, tag: &str) -> Option<String> {
    node.children()
        .find(|c| c.has_tag_name(tag))
        .and_then(|c| c.text())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_atom_feed_entries() {
        let body = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <title>  A Study of Something  </title>
    <summary>An abstract about something.</summary>
    <published>2024-01-05T00:00:00Z</published>
  </entry>
</feed>"#;
        let items = parse_atom_entries(body, "arxiv", "arXiv License");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A Study of Something");
        assert_eq!(items[0].arxiv_id.as_deref(), Some("2401.00001v1"));
    }
}
