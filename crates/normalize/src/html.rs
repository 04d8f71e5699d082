use chrono::{DateTime, Utc};
use scraper::{Html, Selector};

/// Result of extracting readable content from an HTML document.
#[derive(Clone, Debug, Default)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub text: String,
    pub date: Option<DateTime<Utc>>,
    pub author: Option<String>,
    /// True if a JSON-LD `NewsArticle`/`ScholarlyArticle` block supplied
    /// the structured fields rather than the tag-removal fallback walk.
    pub from_structured_data: bool,
}

/// Extract readable content from an HTML document: first try a JSON-LD
/// `NewsArticle`/`ScholarlyArticle` block for title/date/author plus
/// `articleBody`, falling back to a tag-removal tree-walk when no usable
/// JSON-LD block is present.
pub fn extract(html: &str) -> ExtractedContent {
    if let Some(structured) = extract_json_ld(html) {
        if structured.title.is_some() || !structured.text.trim().is_empty() {
            return structured;
        }
    }
    let text = extract_readable_text(html);
    let title = extract_title_tag(html);
    ExtractedContent { title, text, date: None, author: None, from_structured_data: false }
}

fn extract_json_ld(html: &str) -> Option<ExtractedContent> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for element in document.select(&selector) {
        let raw = element.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw.trim()) else {
            continue;
        };
        for candidate in flatten_json_ld(&value) {
            let ty = candidate["@type"].as_str().unwrap_or_default();
            if !(ty == "NewsArticle" || ty == "ScholarlyArticle" || ty == "Article" || ty == "ReportageNewsArticle") {
                continue;
            }
            let title = candidate["headline"].as_str().or_else(|| candidate["name"].as_str()).map(str::to_string);
            let text = candidate["articleBody"]
                .as_str()
                .or_else(|| candidate["description"].as_str())
                .unwrap_or_default()
                .to_string();
            let author = candidate["author"]["name"]
                .as_str()
                .or_else(|| candidate["author"].as_str())
                .map(str::to_string);
            let date = candidate["datePublished"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));

            if title.is_some() || !text.is_empty() {
                return Some(ExtractedContent { title, text, date, author, from_structured_data: true });
            }
        }
    }
    None
}

/// JSON-LD may wrap candidates in a `@graph` array or present a bare
/// array of nodes; flatten both shapes into a single iterable.
fn flatten_json_ld(value: &serde_json::Value) -> Vec<&serde_json::Value> {
    if let Some(graph) = value.get("@graph").and_then(|g| g.as_array()) {
        return graph.iter().collect();
    }
    if let Some(arr) = value.as_array() {
        return arr.iter().collect();
    }
    vec![value]
}

fn extract_title_tag(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    document.select(&selector).next().map(|e| e.text().collect::<String>().trim().to_string()).filter(|s| !s.is_empty())
}

/// Tag-removal tree-walk readable-text extractor, generalized from the
/// teacher's `extract_html_content`.
fn extract_readable_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let remove_selectors = ["script", "style", "nav", "footer", "header", "noscript", "svg", "aside"];

    let mut skip_ids = std::collections::HashSet::new();
    for sel_str in &remove_selectors {
        if let Ok(selector) = Selector::parse(sel_str) {
            for element in document.select(&selector) {
                skip_ids.insert(element.id());
            }
        }
    }

    let mut text_parts = Vec::new();
    for node in document.tree.nodes() {
        let mut should_skip = false;
        let mut check_id = Some(node.id());
        while let Some(id) = check_id {
            if skip_ids.contains(&id) {
                should_skip = true;
                break;
            }
            check_id = document.tree.get(id).and_then(|n| n.parent()).map(|p| p.id());
        }
        if should_skip {
            continue;
        }
        if let Some(text) = node.value().as_text() {
            let trimmed = text.text.trim();
            if !trimmed.is_empty() {
                text_parts.push(trimmed.to_string());
            }
        }
    }

    collapse_whitespace(&text_parts.join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(c);
            prev_was_space = false;
        }
    }
    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_tag_removal_without_json_ld() {
        let html = r#"<html><body><nav>Nav</nav><main><h1>Title</h1><p>Body text here.</p></main></body></html>"#;
        let out = extract(html);
        assert!(!out.from_structured_data);
        assert!(out.text.contains("Body text here."));
        assert!(!out.text.contains("Nav"));
    }

    #[test]
    fn prefers_json_ld_news_article() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
            {"@type":"NewsArticle","headline":"Big Headline","articleBody":"The actual article text.","datePublished":"2024-05-01T00:00:00Z","author":{"name":"Jane Doe"}}
            </script>
            </head><body><p>fallback text</p></body></html>
        "#;
        let out = extract(html);
        assert!(out.from_structured_data);
        assert_eq!(out.title.as_deref(), Some("Big Headline"));
        assert_eq!(out.text, "The actual article text.");
        assert_eq!(out.author.as_deref(), Some("Jane Doe"));
        assert!(out.date.is_some());
    }
}
