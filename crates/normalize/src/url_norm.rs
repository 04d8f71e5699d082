use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Query parameters stripped during canonicalization because they vary
/// across otherwise-identical fetches of the same resource: S3/Azure
/// signed-URL params, CDN version tags, and marketing UTM tags (spec
/// §4.5).
static VOLATILE_PARAMS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "versionid",
        "x-amz-signature",
        "x-amz-credential",
        "x-amz-date",
        "x-amz-expires",
        "x-amz-security-token",
        "x-amz-signedheaders",
        "sig",
        "signature",
        "se", // Azure SAS expiry
        "sp", // Azure SAS permissions
        "sv", // Azure SAS version
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_term",
        "utm_content",
    ]
});

static DOT_SEGMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[^/]+/\.\./").unwrap());

fn is_volatile(key: &str) -> bool {
    let lower = key.to_lowercase();
    VOLATILE_PARAMS.iter().any(|p| *p == lower) || lower.starts_with("utm_")
}

/// Collapse `/a/b/../c/` segments down to `/a/c/` until no more remain.
fn collapse_dot_segments(path: &str) -> String {
    let mut current = path.to_string();
    loop {
        let replaced = DOT_SEGMENTS.replace(&current, "/").to_string();
        if replaced == current {
            break;
        }
        current = replaced;
    }
    current
}

/// Canonicalize a URL for dedup/identity purposes:
/// lowercase scheme and host, strip the fragment, strip volatile query
/// parameters, collapse `../` path segments, drop a single trailing slash
/// on a non-root path, and sort remaining query parameters for stable
/// comparison. Returns the original string unchanged if it doesn't parse
/// as a URL.
pub fn canonicalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let scheme = url.scheme().to_lowercase();
    let _ = url.set_scheme(&scheme);
    if let Some(host) = url.host_str() {
        let host = host.to_lowercase();
        let _ = url.set_host(Some(&host));
    }
    url.set_fragment(None);

    let collapsed_path = collapse_dot_segments(url.path());
    let trimmed_path = if collapsed_path.len() > 1 && collapsed_path.ends_with('/') {
        collapsed_path.trim_end_matches('/').to_string()
    } else {
        collapsed_path
    };
    url.set_path(&trimmed_path);

    let mut pairs: Vec<(String, String)> =
        url.query_pairs().into_owned().filter(|(k, _)| !is_volatile(k)).collect();
    pairs.sort();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let query = pairs.into_iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
        url.set_query(Some(&query));
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fragment_and_lowercases_host() {
        assert_eq!(
            canonicalize_url("https://Example.COM/path#section"),
            "https://example.com/path"
        );
    }

    #[test]
    fn strips_utm_and_signature_params_but_keeps_real_ones() {
        let out = canonicalize_url("https://example.com/a?id=5&utm_source=x&Signature=abc");
        assert_eq!(out, "https://example.com/a?id=5");
    }

    #[test]
    fn collapses_dot_segments() {
        let out = canonicalize_url("https://example.com/a/b/../c/");
        assert_eq!(out, "https://example.com/a/c");
    }

    #[test]
    fn sorts_query_params_for_stable_comparison() {
        let a = canonicalize_url("https://example.com/x?b=2&a=1");
        let b = canonicalize_url("https://example.com/x?a=1&b=2");
        assert_eq!(a, b);
    }

    #[test]
    fn passes_through_unparseable_strings() {
        assert_eq!(canonicalize_url("not a url"), "not a url");
    }
}
