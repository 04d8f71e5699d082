use once_cell::sync::Lazy;
use regex::Regex;

use eatc_common::config::Credentials;
use eatc_http::HttpClient;
use eatc_http::Deadline;

use crate::html::extract;
use crate::pdf::extract_pdf_text;
use crate::quote::select_claim_sentences;

/// Outcome of attempting to resolve past a paywall, ported
/// from the original's `paywall_resolver.py::resolve()` three-step
/// pipeline: DOI -> Unpaywall OA PDF/Crossref abstract, HTML meta PDF
/// discovery, then a known-mirror transform.
#[derive(Clone, Debug, Default)]
pub struct ResolvedContent {
    pub title: Option<String>,
    pub text: String,
    pub quotes: Vec<String>,
    pub source: &'static str,
    #[allow(dead_code)]
    pub doi: Option<String>,
}

static DOI_URL_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/doi/(?:abs/|pdf/|full/)?(10\.\d{4,9}/[^\s?#]+)").unwrap());
static META_DOI_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta[^>]+(?:name|property)="(?:citation_doi|dc\.identifier)"[^>]*content="(10\.\d{4,9}/[^"]+)""#).unwrap()
});
static META_PDF_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta[^>]+(?:name|property)=["'](?:citation_pdf_url|pdf_url|og:pdf|eprints\.pdfUrl)["'][^>]+content=["']([^"']+)["']"#).unwrap()
});

fn extract_doi_from_url(url: &str) -> Option<String> {
    DOI_URL_RX.captures(url).map(|c| c[1].to_string())
}

fn extract_doi_from_html(html: &str) -> Option<String> {
    META_DOI_RX.captures(html).map(|c| c[1].to_string())
}

fn find_pdf_in_html(html: &str) -> Option<String> {
    META_PDF_RX.captures(html).map(|c| c[1].to_string())
}

/// `(predicate, transform)` mirror hints for well-known organizations
/// whose publisher pages redirect or otherwise gate the canonical URL,
/// ported verbatim as data from `paywall_resolver.py::MIRRORS`.
fn mirror_candidates(url: &str) -> Vec<String> {
    let mut out = Vec::new();
    if url.contains("unwto.org") {
        out.push(url.replace("www.unwto.org", "en.unwto-ap.org").replace("unwto.org", "en.unwto-ap.org"));
    }
    if url.contains("who.int") {
        out.push(url.replace("www.who.int", "iris.who.int"));
    }
    if url.contains("imf.org") {
        out.push(url.replace("/publications/", "/en/Publications/"));
    }
    out
}

/// `(status, body)` indicate a gate per the original's conservative
/// phrase-signal list — avoids false positives on mere "login" nav text.
fn looks_gated(status: u16, html: &str) -> bool {
    if matches!(status, 401 | 402 | 403) {
        return true;
    }
    let lower = html.to_lowercase();
    const SIGNALS: &[&str] = &[
        "paywall",
        "metered access",
        "subscribe to read",
        "purchase this article",
        "get access",
        "institutional access",
        "please sign in to continue",
    ];
    SIGNALS.iter().any(|s| lower.contains(s))
}

async fn unpaywall_best_oa(http: &HttpClient, doi: &str, credentials: &Credentials, deadline: Deadline) -> Option<String> {
    let email = credentials.unpaywall_email.as_deref().unwrap_or("open@example.com");
    let url = format!("https://api.unpaywall.org/v2/{doi}?email={email}");
    let outcome = http.get_text(&url, &[], deadline).await.ok()?;
    if outcome.status != 200 {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(&outcome.body).ok()?;
    let best = &value["best_oa_location"];
    best["url_for_pdf"].as_str().or_else(|| best["url"].as_str()).map(str::to_string)
}

async fn crossref_meta(http: &HttpClient, doi: &str, deadline: Deadline) -> Option<(Option<String>, String)> {
    let url = format!("https://api.crossref.org/works/{doi}");
    let outcome = http.get_text(&url, &[], deadline).await.ok()?;
    if outcome.status != 200 {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(&outcome.body).ok()?;
    let msg = &value["message"];
    let title = msg["title"][0].as_str().map(str::to_string);
    let abstract_text = msg["abstract"].as_str().unwrap_or_default().to_string();
    Some((title, abstract_text))
}

/// Attempt to resolve readable content past a paywall. `html` is whatever
/// body was already fetched for `url` (possibly gated); `content_type` is
/// its response `Content-Type` header, if known. Returns `None` if no
/// strategy improved on what the caller already has.
pub async fn resolve(
    http: &HttpClient,
    url: &str,
    html: Option<&str>,
    credentials: &Credentials,
    max_pdf_pages: usize,
    deadline: Deadline,
) -> Option<ResolvedContent> {
    let doi = extract_doi_from_url(url).or_else(|| html.and_then(extract_doi_from_html));

    if let Some(doi) = &doi {
        if let Some(oa_url) = unpaywall_best_oa(http, doi, credentials, deadline).await {
            if let Ok((status, bytes)) = http.get_binary(&oa_url, deadline).await {
                if status == 200 {
                    let pdf = extract_pdf_text(&bytes, max_pdf_pages);
                    if !pdf.text.trim().is_empty() {
                        let quotes = select_claim_sentences(&pdf.text, 2);
                        return Some(ResolvedContent {
                            title: None,
                            text: pdf.text,
                            quotes,
                            source: "unpaywall",
                            doi: Some(doi.clone()),
                        });
                    }
                }
            }
        }
        if let Some((title, abstract_text)) = crossref_meta(http, doi, deadline).await {
            if title.is_some() || !abstract_text.is_empty() {
                let clipped: String = abstract_text.chars().take(2000).collect();
                let quotes = select_claim_sentences(&clipped, 2);
                return Some(ResolvedContent { title, text: abstract_text, quotes, source: "crossref", doi: Some(doi.clone()) });
            }
        }
    }

    if let Some(html) = html {
        if let Some(pdf_url) = find_pdf_in_html(html) {
            if let Ok((status, bytes)) = http.get_binary(&pdf_url, deadline).await {
                if status == 200 {
                    let pdf = extract_pdf_text(&bytes, max_pdf_pages);
                    if !pdf.text.trim().is_empty() {
                        let quotes = select_claim_sentences(&pdf.text, 2);
                        return Some(ResolvedContent { title: None, text: pdf.text, quotes, source: "meta-pdf", doi });
                    }
                }
            }
        }
    }

    for mirror_url in mirror_candidates(url) {
        if let Ok(outcome) = http.get_text(&mirror_url, &[], deadline).await {
            if outcome.status == 200 && outcome.body.len() > 500 {
                let extracted = extract(&outcome.body);
                return Some(ResolvedContent {
                    title: extracted.title,
                    text: extracted.text,
                    quotes: Vec::new(),
                    source: "mirror",
                    doi,
                });
            }
        }
    }

    None
}

pub fn is_gated(status: u16, html: &str) -> bool {
    looks_gated(status, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_doi_from_publisher_url() {
        let doi = extract_doi_from_url("https://journal.example.org/doi/full/10.1038/s41586-021-03819-2").unwrap();
        assert_eq!(doi, "10.1038/s41586-021-03819-2");
    }

    #[test]
    fn detects_gated_status_codes() {
        assert!(looks_gated(403, ""));
        assert!(!looks_gated(200, "<html>welcome</html>"));
    }

    #[test]
    fn detects_gated_phrase_signals() {
        assert!(looks_gated(200, "<p>Subscribe to read the full article</p>"));
    }

    #[test]
    fn mirror_transform_applies_for_unwto_hosts() {
        let mirrors = mirror_candidates("https://www.unwto.org/report");
        assert!(mirrors.iter().any(|m| m.contains("unwto-ap.org")));
    }
}
