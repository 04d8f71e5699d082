use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use eatc_common::types::EvidenceItem;

const W_DOMAIN: f64 = 0.4;
const W_TRIANGULATION: f64 = 0.4;
const W_RECENCY: f64 = 0.2;

/// Per-domain credibility priors. Suffix entries (leading `.`) match by
/// `ends_with`; prefix entries (trailing `.`) match by `starts_with`.
static DOMAIN_PRIOR: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("unwto.org", 0.95),
        ("wttc.org", 0.90),
        ("iata.org", 0.90),
        ("oecd.org", 0.90),
        ("ec.europa.eu", 0.90),
        ("eurostat.ec.europa.eu", 0.90),
        ("worldbank.org", 0.90),
        ("imf.org", 0.90),
        ("un.org", 0.90),
        ("who.int", 0.90),
        ("ustravel.org", 0.88),
        (".gov", 0.85),
        (".edu", 0.80),
        (".ac.uk", 0.80),
        ("str.com", 0.88),
        ("costar.com", 0.88),
        ("statista.com", 0.85),
        ("gartner.com", 0.85),
        ("forrester.com", 0.85),
        ("mckinsey.com", 0.85),
        ("bcg.com", 0.85),
        ("deloitte.com", 0.85),
        ("pwc.com", 0.85),
        ("skift.com", 0.82),
        ("phocuswright.com", 0.80),
        ("traveldailynews.com", 0.75),
        ("hospitalitynet.org", 0.65),
        ("travelpulse.com", 0.65),
        ("travelweekly.com", 0.65),
        ("revfine.com", 0.60),
        ("coaxsoft.com", 0.60),
        ("blog.", 0.55),
        ("unknown", 0.50),
    ])
});

/// Credibility prior for a domain: exact match first, then suffix/prefix
/// pattern, else the 0.50 default.
pub fn domain_prior(domain: &str) -> f64 {
    if domain.is_empty() {
        return 0.50;
    }
    let lower = domain.to_lowercase();
    let lower = lower.trim();
    if let Some(&score) = DOMAIN_PRIOR.get(lower) {
        return score;
    }
    for (pattern, score) in DOMAIN_PRIOR.iter() {
        if let Some(suffix) = pattern.strip_prefix('.') {
            if lower.ends_with(&format!(".{suffix}")) || lower == suffix {
                return *score;
            }
        } else if let Some(prefix) = pattern.strip_suffix('.') {
            if lower.starts_with(&format!("{prefix}.")) {
                return *score;
            }
        }
    }
    0.50
}

fn recency_score(collected_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - collected_at).num_days();
    if days <= 30 {
        1.0
    } else if days <= 90 {
        0.8
    } else if days <= 180 {
        0.6
    } else if days <= 365 {
        0.4
    } else {
        0.2
    }
}

/// Recompute an item's confidence score: 40% domain authority,
/// 40% triangulation status, 20% recency. `date` is the article's own
/// publication date when known; `collected_at` is only when the item was
/// fetched, not when it was published, so an absent `date` falls back to
/// the spec's unknown-date 0.5 recency score rather than treating the
/// item as freshly published.
pub fn recompute_confidence(item: &EvidenceItem, triangulated: bool, now: DateTime<Utc>) -> f64 {
    let domain_score = domain_prior(&item.source_domain);
    let triangulation_score = if triangulated { 1.0 } else { 0.0 };
    let recency = match item.date {
        Some(d) => recency_score(d, now),
        None => 0.5,
    };
    W_DOMAIN * domain_score + W_TRIANGULATION * triangulation_score + W_RECENCY * recency
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn exact_domain_match_wins_over_suffix() {
        assert_eq!(domain_prior("unwto.org"), 0.95);
    }

    #[test]
    fn gov_suffix_matches_generic_domain() {
        assert_eq!(domain_prior("tourism.example.gov"), 0.85);
    }

    #[test]
    fn unknown_domain_gets_default_prior() {
        assert_eq!(domain_prior("some-random-site.xyz"), 0.50);
    }

    #[test]
    fn triangulated_recent_item_scores_higher() {
        let now = Utc::now();
        let mut item = EvidenceItem::new("https://unwto.org/x".into(), "t".into(), Some("s".into()), "p".into(), "unwto.org".into());
        item.collected_at = now - Duration::days(5);
        let score = recompute_confidence(&item, true, now);
        assert!(score > 0.9);
    }

    #[test]
    fn dateless_item_gets_unknown_recency_not_collected_at_recency() {
        let now = Utc::now();
        // `collected_at` defaults to ~now (the item was just fetched), but
        // with no publication `date` the recency term must use the
        // unknown-date 0.5 score, not treat the fetch time as recency.
        let item = EvidenceItem::new("https://unwto.org/x".into(), "t".into(), Some("s".into()), "p".into(), "unwto.org".into());
        assert!(item.date.is_none());
        let with_date_score = recompute_confidence(
            &{
                let mut i = item.clone();
                i.date = Some(now);
                i
            },
            true,
            now,
        );
        let without_date_score = recompute_confidence(&item, true, now);
        assert!((without_date_score - (with_date_score - W_RECENCY * 0.5)).abs() < 1e-9);
    }
}
