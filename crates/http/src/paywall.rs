/// Path suffixes that indicate a redirect landed on a login/subscribe wall
/// rather than the requested content. Ported verbatim from the original
/// research system's `guarded_get.PAYWALL_HINTS`.
pub const PAYWALL_HINTS: &[&str] = &["/login", "/signin", "/sso", "/subscribe", "/purchase", "/paywall"];

/// Hosts known to paywall everything of marginal research value — skipped
/// outright rather than fetched and then discarded.
pub const LOW_VALUE_PAYWALLED: &[&str] = &["statista.com"];

/// Body phrases that indicate a 200-status response is actually a paywall
/// or login gate rendered as a normal page.
const GATED_BODY_SIGNALS: &[&str] = &[
    "paywall",
    "metered access",
    "subscribe to read",
    "purchase this article",
    "get access",
    "institutional access",
    "please sign in to continue",
];

pub fn is_low_value_paywalled_host(host: &str) -> bool {
    let host = host.to_lowercase();
    LOW_VALUE_PAYWALLED.iter().any(|d| host.contains(d))
}

pub fn path_has_paywall_hint(path: &str) -> bool {
    let path = path.to_lowercase();
    PAYWALL_HINTS.iter().any(|hint| path.contains(hint))
}

/// Whether a response with the given status and body looks gated, per the
/// original's `paywall_resolver.looks_gated` heuristic.
pub fn looks_gated(status: u16, body: &str) -> bool {
    if status == 401 || status == 402 || status == 403 {
        return true;
    }
    let lower = body.to_lowercase();
    GATED_BODY_SIGNALS.iter().any(|signal| lower.contains(signal))
}

/// Detect a Cloudflare interstitial challenge page: `server` header starts
/// with `cloudflare` and the body carries one of its known challenge
/// signatures.
pub fn is_cloudflare_challenge(server_header: Option<&str>, body: &str) -> bool {
    let Some(server) = server_header else { return false };
    if !server.to_lowercase().starts_with("cloudflare") {
        return false;
    }
    let lower = body.to_lowercase();
    lower.contains("just a moment") || lower.contains("cf-chl") || lower.contains("checking your browser")
}

/// UNWTO ships an Asia-Pacific mirror that isn't behind the same
/// Cloudflare challenge as the main site.
pub fn unwto_mirror_url(url: &str) -> Option<String> {
    if !url.contains("unwto.org") {
        return None;
    }
    Some(url.replace("www.unwto.org", "en.unwto-ap.org").replace("unwto.org", "en.unwto-ap.org"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_gated_status_codes() {
        assert!(looks_gated(403, ""));
        assert!(!looks_gated(200, "plain article text"));
    }

    #[test]
    fn detects_gated_body_signal() {
        assert!(looks_gated(200, "Please subscribe to read the full article."));
    }

    #[test]
    fn detects_cloudflare_challenge() {
        assert!(is_cloudflare_challenge(Some("cloudflare"), "Checking your browser before accessing"));
        assert!(!is_cloudflare_challenge(Some("nginx"), "just a moment"));
    }

    #[test]
    fn rewrites_unwto_mirror() {
        let mirror = unwto_mirror_url("https://www.unwto.org/news/report").unwrap();
        assert!(mirror.contains("en.unwto-ap.org"));
    }
}
