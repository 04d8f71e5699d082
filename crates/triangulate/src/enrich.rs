use std::collections::HashSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use eatc_common::domain::canonical_domain;
use eatc_common::types::{Cluster, EvidenceItem};

const K_PER_FAMILY: usize = 2;
const MAX_QUERIES_PER_FAMILY: usize = 5;
const RESULTS_PER_QUERY: usize = 3;
const QUERY_KEY_MAX_LEN: usize = 140;

/// Site-scoped search prefixes for primary international/official sources,
/// ported verbatim from the original's `primary_fill.py::PRIMARY_SITES`.
const PRIMARY_SITES: &[&str] = &[
    "site:unwto.org",
    "site:unwto-ap.org",
    "site:e-unwto.org",
    "site:wttc.org",
    "site:iata.org",
    "site:oecd.org",
    "site:imf.org",
    "site:worldbank.org",
    "site:ec.europa.eu",
    "site:who.int",
    "site:un.org",
];

static METRIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d{1,3}(?:\.\d+)?%|Q[1-4]\s*\d{4}|\b20\d{2}\b|\bmillion\b|\bbillion\b").unwrap());

fn host_of(url: &str) -> String {
    url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_default()
}

/// Search backend capability used by primary-source enrichment. Engines
/// without a working provider fan-out can simply not construct an
/// implementor and enrichment becomes a no-op.
#[async_trait]
pub trait PrimarySearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Vec<(String, String)>;
}

/// Fetch-and-normalize backend used to turn a primary-source search hit
/// into a full evidence item.
#[async_trait]
pub trait PrimaryExtract: Send + Sync {
    async fn extract(&self, url: &str, title: &str) -> Option<EvidenceItem>;
}

fn queries_for_family(representative_claim: &str) -> Vec<String> {
    let mut parts = Vec::new();
    if !representative_claim.is_empty() {
        let key: String = representative_claim.chars().take(QUERY_KEY_MAX_LEN).collect();
        parts.push(key);
    }
    let metrics: Vec<String> = METRIC_PATTERN.find_iter(representative_claim).take(2).map(|m| m.as_str().to_string()).collect();
    parts.extend(metrics);

    let mut queries = Vec::new();
    for site in PRIMARY_SITES {
        for part in &parts {
            if !part.trim().is_empty() {
                queries.push(format!("{} {site}", part.trim()));
            }
        }
    }
    queries
}

/// Backfill triangulated clusters that lack a primary-org source with one.
/// Admits only results whose canonical domain is itself a known primary
/// org, caps additions at `K_PER_FAMILY` per cluster, and tags every added
/// item's metadata with `primary_fill` and `family_key`.
pub async fn primary_fill_for_clusters(
    clusters: &[Cluster],
    search: &dyn PrimarySearch,
    extract: &dyn PrimaryExtract,
) -> Vec<EvidenceItem> {
    let mut new_items = Vec::new();

    let needing_primary: Vec<&Cluster> = clusters
        .iter()
        .filter(|c| c.is_triangulated() && !c.is_dropped())
        .filter(|c| !c.domains.iter().any(|d| eatc_common::domain::is_primary_domain(d)))
        .collect();

    for cluster in needing_primary {
        let mut added = 0usize;
        let queries = queries_for_family(&cluster.representative_claim);
        let family_key: String = cluster.representative_claim.chars().take(100).collect();

        'queries: for query in queries.iter().take(MAX_QUERIES_PER_FAMILY) {
            if added >= K_PER_FAMILY {
                break;
            }
            let results = search.search(query, RESULTS_PER_QUERY).await;
            for (url, title) in results {
                if added >= K_PER_FAMILY {
                    break 'queries;
                }
                if url.is_empty() || !eatc_common::domain::is_primary_domain(&host_of(&url)) {
                    continue;
                }
                let Some(mut item) = extract.extract(&url, &title).await else { continue };
                item.source_domain = canonical_domain(&host_of(&url));
                item.metadata.insert("primary_fill".to_string(), Value::Bool(true));
                item.metadata.insert("family_key".to_string(), Value::String(family_key.clone()));
                new_items.push(item);
                added += 1;
            }
        }
    }

    new_items
}

/// Authoritative-org promotion.
///
/// Resolves the two competing predicates the original carries
/// (`is_primary_domain_enhanced` on a single card vs. an unconditional
/// `PRIMARY_ORGS` check inside metrics) into one pass, run once before
/// metric computation: items admitted through [`primary_fill_for_clusters`]
/// are already confirmed to sit on a primary domain by construction and
/// are promoted unconditionally; any other item lands on the same
/// unconditional promotion only when its domain is a primary domain *and*
/// its text carries at least two numeric tokens, matching the secondary
/// `PRIMARY_ORGS` "primary if accompanied by numeric content" rule. C10
/// reads only the resulting `is_primary_source` flag afterward — no
/// second independent check at metric time.
pub fn promote_primary_sources(items: &mut [EvidenceItem]) {
    for item in items.iter_mut() {
        if item.is_primary_source {
            continue;
        }
        let explicit_fill = item.metadata.get("primary_fill").and_then(|v| v.as_bool()).unwrap_or(false);
        if explicit_fill {
            item.is_primary_source = true;
            continue;
        }
        let path = url::Url::parse(&item.url).map(|u| u.path().to_string()).unwrap_or_default();
        if !eatc_common::domain::is_primary_domain_enhanced(&item.source_domain, &path) {
            continue;
        }
        if crate::text_norm::numeric_tokens(&item.snippet).len() >= 2 {
            item.is_primary_source = true;
        }
    }
}

/// Merge newly enriched items into the existing item set, deduplicating by
/// URL (ported from the original's `dedup_merge`).
pub fn dedup_merge(existing: Vec<EvidenceItem>, new: Vec<EvidenceItem>) -> Vec<EvidenceItem> {
    let mut seen: HashSet<String> = existing.iter().map(|c| c.url.clone()).collect();
    let mut merged = existing;
    for item in new {
        if seen.insert(item.url.clone()) {
            merged.push(item);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use eatc_common::types::ClaimType;
    use std::collections::BTreeSet;

    struct StubSearch;
    #[async_trait]
    impl PrimarySearch for StubSearch {
        async fn search(&self, _query: &str, _limit: usize) -> Vec<(String, String)> {
            vec![("https://unwto.org/report-1".to_string(), "UNWTO Report".to_string())]
        }
    }

    struct StubExtract;
    #[async_trait]
    impl PrimaryExtract for StubExtract {
        async fn extract(&self, url: &str, title: &str) -> Option<EvidenceItem> {
            Some(EvidenceItem::new(url.to_string(), title.to_string(), Some("arrivals grew 14% in 2023".into()), "primary-fill".into(), "unwto.org".into()))
        }
    }

    #[tokio::test]
    async fn fills_primary_source_for_cluster_without_one() {
        let domains: BTreeSet<String> = ["a.example.com".to_string(), "b.example.com".to_string()].into_iter().collect();
        let cluster = Cluster::new(vec![0, 1], domains, "Arrivals grew 14% in 2023".into(), ClaimType::NumericMeasure);
        let added = primary_fill_for_clusters(&[cluster], &StubSearch, &StubExtract).await;
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].metadata.get("primary_fill"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn skips_cluster_that_already_has_a_primary_source() {
        let domains: BTreeSet<String> = ["unwto.org".to_string(), "b.example.com".to_string()].into_iter().collect();
        let cluster = Cluster::new(vec![0, 1], domains, "Arrivals grew 14% in 2023".into(), ClaimType::NumericMeasure);
        let added = primary_fill_for_clusters(&[cluster], &StubSearch, &StubExtract).await;
        assert!(added.is_empty());
    }

    #[test]
    fn promotes_item_with_explicit_primary_fill_tag() {
        let mut item = EvidenceItem::new("https://unwto.org/1".into(), "t".into(), Some("no numbers here".into()), "primary-fill".into(), "unwto.org".into());
        item.metadata.insert("primary_fill".to_string(), Value::Bool(true));
        let mut items = vec![item];
        promote_primary_sources(&mut items);
        assert!(items[0].is_primary_source);
    }

    #[test]
    fn promotes_primary_domain_item_only_with_enough_numeric_tokens() {
        let mut items = vec![
            EvidenceItem::new("https://worldbank.org/1".into(), "t".into(), Some("growth was strong".into()), "worldbank".into(), "worldbank.org".into()),
            EvidenceItem::new("https://worldbank.org/2".into(), "t".into(), Some("arrivals grew 14% in 2023".into()), "worldbank".into(), "worldbank.org".into()),
        ];
        promote_primary_sources(&mut items);
        assert!(!items[0].is_primary_source);
        assert!(items[1].is_primary_source);
    }

    #[test]
    fn promotes_numeric_stats_path_on_non_primary_host() {
        let mut items = vec![EvidenceItem::new(
            "https://data.census.gov/en/api/tourism/2023/country/840".into(),
            "t".into(),
            Some("arrivals grew 14% in 2023".into()),
            "census".into(),
            "data.census.gov".into(),
        )];
        promote_primary_sources(&mut items);
        assert!(items[0].is_primary_source);
    }

    #[test]
    fn dedup_merge_drops_url_duplicates() {
        let existing = vec![EvidenceItem::new("https://a.example.com/1".into(), "t".into(), None, "p".into(), "a.example.com".into())];
        let new = vec![EvidenceItem::new("https://a.example.com/1".into(), "t2".into(), None, "p".into(), "a.example.com".into())];
        let merged = dedup_merge(existing, new);
        assert_eq!(merged.len(), 1);
    }
}
