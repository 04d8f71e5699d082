use chrono::{DateTime, NaiveDate, Utc};
use eatc_common::domain::canonical_domain;
use eatc_common::types::EvidenceItem;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::trait_def::ProviderContext;

/// `GET url` and parse the body as JSON, incrementing `ctx`'s provider
/// error counter and returning `None` on any failure. Callers never see a
/// raw HTTP or parse error — matching spec §4.2's "never raises on
/// upstream failure" contract.
pub async fn fetch_json(ctx: &ProviderContext<'_>, provider: &str, url: &str, extra_headers: &[(&str, &str)]) -> Option<Value> {
    match ctx.http.get_text(url, extra_headers, ctx.deadline).await {
        Ok(outcome) if outcome.status == 200 => match serde_json::from_str(&outcome.body) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(provider, url = %redact_url(url), error = %e, "provider JSON parse failed");
                None
            }
        },
        Ok(outcome) => {
            tracing::debug!(provider, url = %redact_url(url), status = outcome.status, "provider returned non-200");
            ctx.note_status(outcome.status);
            None
        }
        Err(e) => {
            tracing::debug!(provider, url = %redact_url(url), error = %e, "provider fetch failed");
            None
        }
    }
}

fn redact_url(url: &str) -> String {
    eatc_http::redact::redact(url)
}

/// Host of a URL, lowercased, falling back to the raw string if the URL
/// fails to parse (defensive only — adapters construct their own URLs).
pub fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

/// Build an `EvidenceItem` with the fields every provider sets, applying
/// the snippet fallback chain and canonical-domain invariant.
pub fn make_item(provider: &str, licensing: &str, url: &str, title: &str, snippet: Option<&str>) -> EvidenceItem {
    let domain = canonical_domain(&host_of(url));
    let mut item = EvidenceItem::new(
        url.to_string(),
        title.to_string(),
        snippet.map(str::to_string),
        provider.to_string(),
        domain,
    );
    item.licensing = Some(licensing.to_string());
    item
}

static YEAR_DATE_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(-\d{2})?(-\d{2})?").unwrap());

/// Best-effort parse of a loosely formatted upstream date string
/// (`2024`, `2024-03`, `2024-03-15`, or full RFC3339) into a UTC instant.
pub fn parse_loose_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let caps = YEAR_DATE_RX.captures(raw)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps
        .get(2)
        .and_then(|m| m.as_str().trim_start_matches('-').parse().ok())
        .unwrap_or(1);
    let day: u32 = caps
        .get(3)
        .and_then(|m| m.as_str().trim_start_matches('-').parse().ok())
        .unwrap_or(1);
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(DateTime::from_naive_utc_and_offset(date.and_hms_opt(0, 0, 0)?, Utc))
}

static DOI_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(10\.\d{4,9}/[-._;()/:A-Za-z0-9]+)").unwrap());

/// Extract a bare DOI from a URL or text blob, if present.
pub fn extract_doi(text: &str) -> Option<String> {
    DOI_RX.captures(text).map(|c| c[1].trim_end_matches(['.', ')']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_only_date() {
        let dt = parse_loose_date("2024").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-01");
    }

    #[test]
    fn parses_full_date() {
        let dt = parse_loose_date("2024-03-15").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-03-15");
    }

    #[test]
    fn extracts_doi_from_url() {
        let doi = extract_doi("https://doi.org/10.1038/s41586-021-03819-2").unwrap();
        assert_eq!(doi, "10.1038/s41586-021-03819-2");
    }

    #[test]
    fn item_snippet_falls_back_to_title() {
        let item = make_item("test", "CC0", "https://example.com/a", "Title Only", None);
        assert_eq!(item.snippet, "Title Only");
        assert_eq!(item.source_domain, "example.com");
    }
}
