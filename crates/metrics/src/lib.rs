//! Run-level metrics computation and intent-scoped quality gates (spec
//! §4.10).

pub mod gates;
pub mod thresholds;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eatc_common::types::{Cluster, EvidenceItem};

pub use gates::{evaluate_gates, GateReport};
pub use thresholds::{thresholds_for, Thresholds};

const CREDIBLE_THRESHOLD: f64 = 0.6;
const RECENT_PRIMARY_WINDOW_DAYS: i64 = 365;

/// Every metric named in spec.md §4.10, computed once on the final
/// filtered item/cluster set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub primary_share: f64,
    pub triangulation_rate: f64,
    pub domain_concentration: f64,
    pub unique_domains: usize,
    pub credible_cards: usize,
    pub provider_error_rate: f64,
    pub provider_entropy: f64,
    pub recent_primary_count: usize,
    pub triangulated_clusters: usize,
    pub sample_sizes: SampleSizes,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SampleSizes {
    pub total_cards: usize,
    pub primary: usize,
    pub credible: usize,
}

/// Normalized Shannon entropy of the provider distribution, ported from
/// the original's `triangulation.py::provider_entropy`: zero when there is
/// a single distinct provider (no diversity to measure), otherwise
/// normalized by `log(|providers|)`.
fn provider_entropy(items: &[EvidenceItem]) -> f64 {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.provider.as_str()).or_insert(0) += 1;
    }
    let n: usize = counts.values().sum();
    if counts.is_empty() || n == 0 {
        return 0.0;
    }
    let h: f64 = -counts
        .values()
        .map(|&c| {
            let p = c as f64 / n as f64;
            p * (p + 1e-12).ln()
        })
        .sum::<f64>();
    if counts.len() > 1 {
        h / (counts.len() as f64).ln()
    } else {
        0.0
    }
}

fn is_recent(item: &EvidenceItem, now: DateTime<Utc>) -> bool {
    let reference = item.date.unwrap_or(item.collected_at);
    (now - reference).num_days() <= RECENT_PRIMARY_WINDOW_DAYS
}

/// Compute every metric in spec.md §4.10 from the final item/cluster set.
/// `provider_errors`/`provider_attempts` come from the run's
/// `ProviderStatsRegistry` snapshot.
pub fn compute_metrics(
    items: &[EvidenceItem],
    clusters: &[Cluster],
    provider_errors: u64,
    provider_attempts: u64,
    now: DateTime<Utc>,
) -> Metrics {
    let n = items.len().max(1);

    let primary = items.iter().filter(|i| i.is_primary_source).count();
    let primary_share = primary as f64 / n as f64;

    let triangulated_indices: std::collections::HashSet<usize> =
        clusters.iter().filter(|c| c.is_triangulated()).flat_map(|c| c.item_indices.iter().copied()).collect();
    let triangulation_rate = triangulated_indices.len() as f64 / n as f64;

    let mut domain_counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *domain_counts.entry(item.source_domain.as_str()).or_insert(0) += 1;
    }
    let domain_concentration = domain_counts.values().copied().max().unwrap_or(0) as f64 / n as f64;
    let unique_domains = domain_counts.len();

    let credible_cards = items.iter().filter(|i| i.credibility_score.unwrap_or(0.5) >= CREDIBLE_THRESHOLD).count();

    let provider_error_rate = if provider_attempts > 0 { provider_errors as f64 / provider_attempts as f64 } else { 0.0 };

    let recent_primary_count = items.iter().filter(|i| i.is_primary_source && is_recent(i, now)).count();

    let triangulated_clusters = clusters.iter().filter(|c| c.is_triangulated()).count();

    Metrics {
        primary_share,
        triangulation_rate,
        domain_concentration,
        unique_domains,
        credible_cards,
        provider_error_rate,
        provider_entropy: provider_entropy(items),
        recent_primary_count,
        triangulated_clusters,
        sample_sizes: SampleSizes { total_cards: items.len(), primary, credible: credible_cards },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eatc_common::types::ClaimType;
    use std::collections::BTreeSet;

    fn item(provider: &str, domain: &str, is_primary: bool, credibility: f64) -> EvidenceItem {
        let mut it = EvidenceItem::new("https://x.example.com/1".into(), "t".into(), Some("s".into()), provider.into(), domain.into());
        it.is_primary_source = is_primary;
        it.credibility_score = Some(credibility);
        it
    }

    #[test]
    fn primary_share_counts_only_flagged_items() {
        let items = vec![item("a", "a.example.com", true, 0.7), item("b", "b.example.com", false, 0.7)];
        let m = compute_metrics(&items, &[], 0, 0, Utc::now());
        assert_eq!(m.primary_share, 0.5);
    }

    #[test]
    fn triangulation_rate_counts_items_in_multi_domain_clusters_only() {
        let items = vec![item("a", "a.example.com", false, 0.7), item("b", "b.example.com", false, 0.7), item("c", "c.example.com", false, 0.7)];
        let domains: BTreeSet<String> = ["a.example.com".into(), "b.example.com".into()].into_iter().collect();
        let cluster = Cluster::new(vec![0, 1], domains, "rep".into(), ClaimType::NewsContext);
        let m = compute_metrics(&items, &[cluster], 0, 0, Utc::now());
        assert!((m.triangulation_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn single_provider_has_zero_entropy() {
        let items = vec![item("a", "a.example.com", false, 0.7), item("a", "b.example.com", false, 0.7)];
        let m = compute_metrics(&items, &[], 0, 0, Utc::now());
        assert_eq!(m.provider_entropy, 0.0);
    }

    #[test]
    fn domain_concentration_is_max_share() {
        let items = vec![item("a", "a.example.com", false, 0.7), item("b", "a.example.com", false, 0.7), item("c", "b.example.com", false, 0.7)];
        let m = compute_metrics(&items, &[], 0, 0, Utc::now());
        assert!((m.domain_concentration - 2.0 / 3.0).abs() < 1e-9);
    }
}
