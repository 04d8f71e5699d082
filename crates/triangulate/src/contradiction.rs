use eatc_common::config::TriangulationConfig;
use eatc_common::domain::is_trusted_domain;
use eatc_common::types::{Cluster, EvidenceItem, Stance};

use crate::text_norm::{extract_numeric_values, DECREASE_WORDS, INCREASE_WORDS};

const MIN_TRUSTED_DOMAINS_TO_PRESERVE: usize = 3;
const MIN_DOMAINS_FOR_NUMERIC_CHECK: usize = 3;
const MIN_SIDE_SIZE_TO_DROP: usize = 2;
const MIN_SIDE_CONFIDENCE_TO_DROP: f64 = 0.6;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Increase,
    Decrease,
}

fn member_direction(text: &str) -> Option<Direction> {
    let lower = text.to_lowercase();
    let has_up = INCREASE_WORDS.iter().any(|w| lower.contains(w));
    let has_down = DECREASE_WORDS.iter().any(|w| lower.contains(w));
    match (has_up, has_down) {
        (true, false) => Some(Direction::Increase),
        (false, true) => Some(Direction::Decrease),
        _ => None,
    }
}

fn relative_difference(a: f64, b: f64) -> f64 {
    let denom = a.abs().max(b.abs());
    if denom == 0.0 {
        return 0.0;
    }
    (a - b).abs() / denom
}

fn member_confidence(item: &EvidenceItem) -> f64 {
    item.confidence.or(item.credibility_score).unwrap_or(0.5)
}

/// Result of analyzing one cluster for internal disagreement.
struct Analysis {
    /// Pair of member-index groups the cluster splits into when
    /// contradictory (e.g. "increase" side vs "decrease" side).
    sides: Option<(Vec<usize>, Vec<usize>)>,
    contradictory: bool,
}

fn analyze(cluster: &Cluster, items: &[EvidenceItem], config: &TriangulationConfig) -> Analysis {
    let members = &cluster.item_indices;

    let directions: Vec<Option<Direction>> = members.iter().map(|&i| member_direction(&items[i].snippet)).collect();
    let increase_side: Vec<usize> = members
        .iter()
        .zip(&directions)
        .filter(|(_, d)| **d == Some(Direction::Increase))
        .map(|(&i, _)| i)
        .collect();
    let decrease_side: Vec<usize> = members
        .iter()
        .zip(&directions)
        .filter(|(_, d)| **d == Some(Direction::Decrease))
        .map(|(&i, _)| i)
        .collect();
    let directional_conflict = !increase_side.is_empty() && !decrease_side.is_empty();

    let mut numeric_conflict = false;
    let mut numeric_sides = None;
    if cluster.domains.len() >= MIN_DOMAINS_FOR_NUMERIC_CHECK {
        let values: Vec<Option<f64>> = members
            .iter()
            .map(|&i| extract_numeric_values(&items[i].snippet).into_iter().next())
            .collect();
        let present: Vec<(usize, f64)> = members.iter().zip(&values).filter_map(|(&i, v)| v.map(|v| (i, v))).collect();
        if present.len() >= 2 {
            let mut total_pairs = 0usize;
            let mut contradictory_pairs = 0usize;
            for a in 0..present.len() {
                for b in (a + 1)..present.len() {
                    total_pairs += 1;
                    if relative_difference(present[a].1, present[b].1) >= config.contradiction_tolerance_pct {
                        contradictory_pairs += 1;
                    }
                }
            }
            if total_pairs > 0 {
                let fraction = contradictory_pairs as f64 / total_pairs as f64;
                if fraction > config.contradiction_fraction_cap {
                    numeric_conflict = true;
                    let mean = present.iter().map(|(_, v)| v).sum::<f64>() / present.len() as f64;
                    let high: Vec<usize> = present.iter().filter(|(_, v)| *v >= mean).map(|(i, _)| *i).collect();
                    let low: Vec<usize> = present.iter().filter(|(_, v)| *v < mean).map(|(i, _)| *i).collect();
                    numeric_sides = Some((high, low));
                }
            }
        }
    }

    let contradictory = directional_conflict || numeric_conflict;
    let sides = if directional_conflict { Some((increase_side, decrease_side)) } else { numeric_sides };

    Analysis { sides, contradictory }
}

fn trusted_domain_count(cluster: &Cluster, extra_trusted: &[String]) -> usize {
    cluster.domains.iter().filter(|d| is_trusted_domain(d, extra_trusted)).count()
}

fn cluster_score(cluster: &Cluster) -> usize {
    cluster.domains.len() * 100 + cluster.item_indices.len()
}

/// Apply contradiction filtering to a cluster set. Clusters
/// backed by at least three trusted domains are preserved untouched.
/// Remaining clusters judged internally contradictory are either dropped
/// outright (only when no trusted domain is present and both sides of the
/// disagreement are large and confident) or kept with `needs_review` set.
/// In strict mode, if every triangulated cluster would otherwise be
/// dropped, the single best-scoring one is restored with `needs_review`
/// set rather than returning zero triangulated clusters.
pub fn filter_contradictory_clusters(
    items: &[EvidenceItem],
    clusters: Vec<Cluster>,
    config: &TriangulationConfig,
    extra_trusted: &[String],
    strict: bool,
) -> Vec<Cluster> {
    let mut best_before_drop: Option<Cluster> = None;
    let mut out = Vec::with_capacity(clusters.len());

    for mut cluster in clusters {
        if !cluster.is_triangulated() {
            out.push(cluster);
            continue;
        }

        let trusted = trusted_domain_count(&cluster, extra_trusted);
        if trusted >= MIN_TRUSTED_DOMAINS_TO_PRESERVE {
            out.push(cluster);
            continue;
        }

        let analysis = analyze(&cluster, items, config);
        if !analysis.contradictory {
            out.push(cluster);
            continue;
        }

        if best_before_drop.as_ref().map(|b| cluster_score(b) < cluster_score(&cluster)).unwrap_or(true) {
            best_before_drop = Some(cluster.clone());
        }

        let should_drop = trusted == 0
            && analysis
                .sides
                .as_ref()
                .map(|(a, b)| {
                    a.len() >= MIN_SIDE_SIZE_TO_DROP
                        && b.len() >= MIN_SIDE_SIZE_TO_DROP
                        && avg_confidence(a, items) >= MIN_SIDE_CONFIDENCE_TO_DROP
                        && avg_confidence(b, items) >= MIN_SIDE_CONFIDENCE_TO_DROP
                })
                .unwrap_or(false);

        if should_drop {
            cluster.dropped_reason = Some("contradictory".to_string());
        } else {
            cluster.needs_review = true;
        }
        out.push(cluster);
    }

    if strict && !out.iter().any(|c| c.is_triangulated() && !c.is_dropped()) {
        if let Some(mut best) = best_before_drop {
            best.dropped_reason = None;
            best.needs_review = true;
            if let Some(existing) = out.iter_mut().find(|c| c.item_indices == best.item_indices) {
                *existing = best;
            } else {
                out.push(best);
            }
        }
    }

    out
}

/// Populate per-item `stance`, `controversy_score`, and `disputed_by` for
/// members of every `needs_review` cluster, using the same side split
/// [`filter_contradictory_clusters`]
/// computed internally. The majority side is marked `supports`, the
/// minority `disputes`; `controversy_score` is the minority's share of
/// the cluster and `disputed_by` lists the opposing side's domains.
pub fn annotate_disputed_items(items: &mut [EvidenceItem], clusters: &[Cluster], config: &TriangulationConfig) {
    let mut updates: Vec<(usize, Stance, f64, Vec<String>)> = Vec::new();

    for cluster in clusters {
        if !cluster.needs_review {
            continue;
        }
        let analysis = analyze(cluster, items, config);
        let Some((side_a, side_b)) = analysis.sides else { continue };
        if side_a.is_empty() || side_b.is_empty() {
            continue;
        }
        let (majority, minority) = if side_a.len() >= side_b.len() { (&side_a, &side_b) } else { (&side_b, &side_a) };
        let total = majority.len() + minority.len();
        let controversy = minority.len() as f64 / total as f64;
        let majority_domains: Vec<String> = majority.iter().map(|&i| items[i].source_domain.clone()).collect();
        let minority_domains: Vec<String> = minority.iter().map(|&i| items[i].source_domain.clone()).collect();

        for &i in majority {
            updates.push((i, Stance::Supports, controversy, minority_domains.clone()));
        }
        for &i in minority {
            updates.push((i, Stance::Disputes, controversy, majority_domains.clone()));
        }
    }

    for (idx, stance, score, disputed_by) in updates {
        items[idx].stance = Some(stance);
        items[idx].controversy_score = Some(score);
        items[idx].disputed_by = disputed_by;
    }
}

fn avg_confidence(indices: &[usize], items: &[EvidenceItem]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| member_confidence(&items[i])).sum::<f64>() / indices.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use eatc_common::types::ClaimType;
    use std::collections::BTreeSet;

    fn item(url: &str, snippet: &str, domain: &str, confidence: f64) -> EvidenceItem {
        let mut it = EvidenceItem::new(url.to_string(), "title".into(), Some(snippet.into()), "test".into(), domain.into());
        it.confidence = Some(confidence);
        it
    }

    fn default_config() -> TriangulationConfig {
        TriangulationConfig {
            paraphrase_threshold_min: 0.32,
            paraphrase_threshold_max: 0.48,
            paraphrase_threshold_override: None,
            degraded_paraphrase_threshold: 0.34,
            jaccard_fallback_threshold: 0.32,
            minhash_shingle_size: 6,
            minhash_lsh_threshold: 0.92,
            minhash_num_perm: 128,
            contradiction_tolerance_pct: 0.35,
            contradiction_fraction_cap: 0.10,
        }
    }

    #[test]
    fn directional_conflict_with_confident_sides_drops_cluster() {
        let items = vec![
            item("https://a.example.com/1", "Arrivals increased sharply this year", "a.example.com", 0.7),
            item("https://b.example.com/2", "Arrivals rose again according to officials", "b.example.com", 0.7),
            item("https://c.example.com/3", "Arrivals declined this year per the ministry", "c.example.com", 0.7),
            item("https://d.example.com/4", "Arrivals fell sharply according to the bureau", "d.example.com", 0.7),
        ];
        let domains: BTreeSet<String> = items.iter().map(|i| i.source_domain.clone()).collect();
        let cluster = Cluster::new((0..4).collect(), domains, "Arrivals changed".into(), ClaimType::NewsContext);
        let out = filter_contradictory_clusters(&items, vec![cluster], &default_config(), &[], false);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_dropped());
    }

    #[test]
    fn trusted_domain_majority_preserves_cluster() {
        let items = vec![
            item("https://unwto.org/1", "Arrivals increased sharply this year", "unwto.org", 0.7),
            item("https://who.int/2", "Arrivals declined this year", "who.int", 0.7),
            item("https://imf.org/3", "Arrivals rose again", "imf.org", 0.7),
        ];
        let domains: BTreeSet<String> = items.iter().map(|i| i.source_domain.clone()).collect();
        let cluster = Cluster::new((0..3).collect(), domains, "Arrivals changed".into(), ClaimType::NewsContext);
        let out = filter_contradictory_clusters(&items, vec![cluster], &default_config(), &[], false);
        assert!(!out[0].is_dropped());
        assert!(!out[0].needs_review);
    }

    #[test]
    fn strict_mode_preserves_best_cluster_instead_of_emptying() {
        let items = vec![
            item("https://a.example.com/1", "Arrivals increased sharply this year", "a.example.com", 0.7),
            item("https://b.example.com/2", "Arrivals rose again according to officials", "b.example.com", 0.7),
            item("https://c.example.com/3", "Arrivals declined this year per the ministry", "c.example.com", 0.7),
            item("https://d.example.com/4", "Arrivals fell sharply according to the bureau", "d.example.com", 0.7),
        ];
        let domains: BTreeSet<String> = items.iter().map(|i| i.source_domain.clone()).collect();
        let cluster = Cluster::new((0..4).collect(), domains, "Arrivals changed".into(), ClaimType::NewsContext);
        let out = filter_contradictory_clusters(&items, vec![cluster], &default_config(), &[], true);
        assert!(out.iter().any(|c| c.is_triangulated() && !c.is_dropped()));
    }

    #[test]
    fn annotate_marks_majority_and_minority_stance() {
        let mut items = vec![
            item("https://a.example.com/1", "Arrivals increased sharply this year", "a.example.com", 0.7),
            item("https://b.example.com/2", "Arrivals rose again according to officials", "b.example.com", 0.7),
            item("https://c.example.com/3", "Arrivals increased per the ministry", "c.example.com", 0.7),
            item("https://d.example.com/4", "Arrivals fell sharply according to the bureau", "d.example.com", 0.7),
        ];
        let domains: BTreeSet<String> = items.iter().map(|i| i.source_domain.clone()).collect();
        let mut cluster = Cluster::new((0..4).collect(), domains, "Arrivals changed".into(), ClaimType::NewsContext);
        cluster.needs_review = true;
        annotate_disputed_items(&mut items, &[cluster], &default_config());
        assert_eq!(items[0].stance, Some(Stance::Supports));
        assert_eq!(items[3].stance, Some(Stance::Disputes));
        assert!(items[3].controversy_score.unwrap() > 0.0);
        assert!(!items[0].disputed_by.is_empty());
    }
}
