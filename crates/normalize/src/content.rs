use eatc_common::config::Credentials;
use eatc_http::{Deadline, HttpClient};

use crate::html::{extract, ExtractedContent};
use crate::paywall::{is_gated, resolve};
use crate::quote::select_claim_sentences;

/// Full result of fetching and extracting one item's source content.
#[derive(Clone, Debug, Default)]
pub struct FetchedContent {
    pub text: String,
    pub title: Option<String>,
    pub quote: Option<String>,
    pub resolved_via_paywall_pipeline: bool,
    pub fetch_failed: bool,
}

/// Fetch `url` and extract readable content, falling back through the
/// paywall resolver when the direct fetch comes back gated or
/// empty. Never propagates an error: a total failure just reports
/// `fetch_failed = true` with empty text, an infallible contract for
/// the scheduler-driven fan-out that calls it.
pub async fn fetch_and_extract(
    http: &HttpClient,
    url: &str,
    credentials: &Credentials,
    max_pdf_pages: usize,
    deadline: Deadline,
) -> FetchedContent {
    let direct = http.get_text(url, &[], deadline).await;

    let (status, body) = match &direct {
        Ok(outcome) => (outcome.status, outcome.body.clone()),
        Err(_) => (0, String::new()),
    };

    let gated = status == 0 || is_gated(status, &body);
    let is_pdf_body = body.trim_start().starts_with("%PDF");

    if !gated && !body.trim().is_empty() && !is_pdf_body {
        let extracted: ExtractedContent = extract(&body);
        if !extracted.text.trim().is_empty() {
            let quote = select_claim_sentences(&extracted.text, 1).into_iter().next();
            return FetchedContent {
                text: extracted.text,
                title: extracted.title,
                quote,
                resolved_via_paywall_pipeline: false,
                fetch_failed: false,
            };
        }
    }

    let html_for_resolver = if gated || body.trim().is_empty() { None } else { Some(body.as_str()) };
    if let Some(resolved) = resolve(http, url, html_for_resolver, credentials, max_pdf_pages, deadline).await {
        let quote = resolved.quotes.into_iter().next();
        return FetchedContent {
            text: resolved.text,
            title: resolved.title,
            quote,
            resolved_via_paywall_pipeline: true,
            fetch_failed: false,
        };
    }

    FetchedContent { fetch_failed: direct.is_err(), ..Default::default() }
}
