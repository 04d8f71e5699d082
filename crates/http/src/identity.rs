use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Per-domain header overrides layered on top of the default identity
/// header.
///
/// Entries match by suffix against the request host (`www.sec.gov` matches
/// the `sec.gov` entry).
static DOMAIN_OVERRIDES: Lazy<Vec<(&'static str, Vec<(&'static str, &'static str)>)>> = Lazy::new(|| {
    vec![
        (
            "sec.gov",
            vec![("Accept-Encoding", "identity")],
        ),
        (
            "reuters.com",
            vec![("Referer", "https://www.google.com/")],
        ),
        (
            "bloomberg.com",
            vec![("Referer", "https://www.google.com/")],
        ),
        (
            "stats.oecd.org",
            vec![("Accept", "application/json")],
        ),
        (
            "data.imf.org",
            vec![("Accept", "application/json")],
        ),
        (
            "ec.europa.eu",
            vec![("Accept", "application/json")],
        ),
    ]
});

/// Build the default product identity header: a User-Agent carrying a
/// contact email, required by several upstreams (OpenAlex, Crossref,
/// Unpaywall) and strongly preferred by the rest.
pub fn default_user_agent(contact_email: Option<&str>) -> String {
    match contact_email {
        Some(email) if !email.is_empty() => {
            format!("EATC-ResearchBot/1.0 (+mailto:{email})")
        }
        _ => "EATC-ResearchBot/1.0".to_string(),
    }
}

/// Merge the default identity header with any per-domain overrides that
/// apply to `host`.
pub fn headers_for_host(host: &str, contact_email: Option<&str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("User-Agent".to_string(), default_user_agent(contact_email));

    let host = host.to_lowercase();
    for (suffix, overrides) in DOMAIN_OVERRIDES.iter() {
        if host == *suffix || host.ends_with(&format!(".{suffix}")) {
            for (k, v) in overrides {
                headers.insert((*k).to_string(), (*v).to_string());
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_email_appears_in_user_agent() {
        let ua = default_user_agent(Some("research@example.org"));
        assert!(ua.contains("research@example.org"));
    }

    #[test]
    fn sec_subdomain_gets_accept_encoding_identity() {
        let headers = headers_for_host("data.sec.gov", None);
        assert_eq!(headers.get("Accept-Encoding").map(String::as_str), Some("identity"));
    }

    #[test]
    fn unrelated_host_gets_only_default_header() {
        let headers = headers_for_host("example.com", None);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("User-Agent"));
    }
}
