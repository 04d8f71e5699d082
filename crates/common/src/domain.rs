//! Canonical domain normalization and primary-source detection.
//!
//! A handful of primary-source organizations publish through regional
//! mirror subdomains (e.g. `e-unwto.org`, `www2.unwto.org`) that should
//! all collapse to one canonical domain before concentration/diversity
//! metrics are computed.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Mirror-subdomain -> canonical-domain collapse table, one entry per
/// primary-source organization family.
static PRIMARY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("e-unwto.org", "unwto.org"),
        ("www2.unwto.org", "unwto.org"),
        ("webunwto.s3.eu-west-1.amazonaws.com", "unwto.org"),
        ("iata.org", "iata.org"),
        ("www.iata.org", "iata.org"),
        ("wttc.org", "wttc.org"),
        ("www.wttc.org", "wttc.org"),
        ("oecd.org", "oecd.org"),
        ("www.oecd.org", "oecd.org"),
        ("stats.oecd.org", "oecd.org"),
        ("data.oecd.org", "oecd.org"),
        ("imf.org", "imf.org"),
        ("www.imf.org", "imf.org"),
        ("data.imf.org", "imf.org"),
        ("worldbank.org", "worldbank.org"),
        ("www.worldbank.org", "worldbank.org"),
        ("data.worldbank.org", "worldbank.org"),
        ("documents.worldbank.org", "worldbank.org"),
        ("ec.europa.eu", "ec.europa.eu"),
        ("eurostat.ec.europa.eu", "ec.europa.eu"),
        ("ec.europa.eu/eurostat", "ec.europa.eu"),
        ("who.int", "who.int"),
        ("www.who.int", "who.int"),
        ("un.org", "un.org"),
        ("www.un.org", "un.org"),
        ("unstats.un.org", "un.org"),
        ("unesco.org", "unesco.org"),
        ("whc.unesco.org", "unesco.org"),
        ("weforum.org", "weforum.org"),
        ("www.weforum.org", "weforum.org"),
    ])
});

/// Canonical domains recognized as primary sources (after alias collapse).
pub static PRIMARY_ORGS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "unwto.org",
        "iata.org",
        "wttc.org",
        "worldbank.org",
        "oecd.org",
        "imf.org",
        "fred.stlouisfed.org",
        "ec.europa.eu",
        "who.int",
        "un.org",
        "unesco.org",
        "weforum.org",
    ]
});

/// Strip a leading `www.`/`m.` and lowercase. Does not perform alias
/// collapse — see [`canonical_domain`] for that.
pub fn normalize_domain(host: &str) -> String {
    let host = host.trim().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("m.").unwrap_or(host);
    host.trim_end_matches('.').to_string()
}

/// Collapse a host to its canonical primary-source domain if it matches a
/// known mirror, otherwise return the normalized host unchanged.
pub fn canonical_domain(host: &str) -> String {
    let normalized = normalize_domain(host);
    if let Some(canon) = PRIMARY_ALIASES.get(normalized.as_str()) {
        return canon.to_string();
    }
    normalized
}

/// Whether a host, after canonicalization, belongs to a recognized
/// primary-source organization.
pub fn is_primary_domain(host: &str) -> bool {
    let canon = canonical_domain(host);
    PRIMARY_ORGS.iter().any(|org| *org == canon)
}

/// Numeric-token-heavy path heuristic: a
/// statistics-portal path with two or more numeric tokens (e.g.
/// `/en/api/tourism/2023/country/840`) is treated as a primary data source
/// even when its host is a generic gov/stats domain, not just when the host
/// itself is in [`PRIMARY_ORGS`].
pub fn is_primary_domain_enhanced(host: &str, path: &str) -> bool {
    if is_primary_domain(host) {
        return true;
    }
    let numeric_token_count = path
        .split(['/', '-', '_', '.'])
        .filter(|tok| !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()))
        .count();
    numeric_token_count >= 2 && looks_like_stats_host(host)
}

/// The broader "trusted domain" set used by contradiction filtering to
/// decide whether a contradicted cluster may still be preserved. Distinct
/// from [`PRIMARY_ORGS`]: this set additionally
/// includes central banks and major scholarly publishers/indices that
/// count as trustworthy corroboration but are not "primary sources" for
/// the `primary_share` metric.
pub static TRUSTED_DOMAINS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // Intergovernmental
        "unwto.org",
        "iata.org",
        "wttc.org",
        "oecd.org",
        "imf.org",
        "worldbank.org",
        "ec.europa.eu",
        "who.int",
        "un.org",
        "unesco.org",
        "ilo.org",
        // Central banks
        "federalreserve.gov",
        "ecb.europa.eu",
        "bis.org",
        // Scholarly publishers and indices
        "nature.com",
        "science.org",
        "nejm.org",
        "thelancet.com",
        "ieee.org",
        "acm.org",
        "arxiv.org",
        "pubmed.gov",
    ]
});

/// Whether `host` is in the curated trusted set, an additional
/// run-configured trusted domain, or matches a `.gov`/`.edu`/`.ac.uk`
/// institutional pattern.
pub fn is_trusted_domain(host: &str, extra: &[String]) -> bool {
    let canon = canonical_domain(host);
    if TRUSTED_DOMAINS.iter().any(|d| *d == canon) {
        return true;
    }
    if extra.iter().any(|d| d == &canon) {
        return true;
    }
    canon.ends_with(".gov") || canon.ends_with(".edu") || canon.ends_with(".ac.uk")
}

fn looks_like_stats_host(host: &str) -> bool {
    let h = normalize_domain(host);
    h.ends_with(".gov")
        || h.contains("stats.")
        || h.contains("data.")
        || h.ends_with(".int")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_unwto_mirrors() {
        assert_eq!(canonical_domain("e-unwto.org"), "unwto.org");
        assert_eq!(canonical_domain("www2.unwto.org"), "unwto.org");
        assert_eq!(canonical_domain("www.unwto.org"), "unwto.org");
    }

    #[test]
    fn passes_through_unknown_hosts() {
        assert_eq!(canonical_domain("www.example.com"), "example.com");
    }

    #[test]
    fn primary_detection_matches_canonical_set() {
        assert!(is_primary_domain("data.worldbank.org"));
        assert!(is_primary_domain("stats.oecd.org"));
        assert!(!is_primary_domain("blog.example.com"));
    }

    #[test]
    fn enhanced_detection_catches_numeric_stats_paths() {
        assert!(is_primary_domain_enhanced(
            "data.census.gov",
            "/en/api/tourism/2023/country/840"
        ));
        assert!(!is_primary_domain_enhanced(
            "blog.example.com",
            "/2023/08/travel-trends"
        ));
    }

    #[test]
    fn trusted_set_includes_central_banks_and_gov_pattern() {
        assert!(is_trusted_domain("federalreserve.gov", &[]));
        assert!(is_trusted_domain("cdc.gov", &[]));
        assert!(is_trusted_domain("mit.edu", &[]));
        assert!(!is_trusted_domain("blog.example.com", &[]));
    }

    #[test]
    fn trusted_set_honors_run_configured_extra() {
        let extra = vec!["example.com".to_string()];
        assert!(is_trusted_domain("example.com", &extra));
    }
}
