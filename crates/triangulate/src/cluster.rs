use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use eatc_common::config::TriangulationConfig;
use eatc_common::types::{ClaimType, Cluster, EvidenceItem};

use crate::text_norm::{is_claimish, normalize_for_paraphrase, numeric_tokens};

const REPRESENTATIVE_MAX_LEN: usize = 240;
/// Similarity band below `threshold` that can still be promoted if two
/// candidates share numeric tokens.
const NEAR_MISS_FLOOR: f64 = 0.25;
const NEAR_MISS_MIN_SHARED_NUMERIC: usize = 2;

/// Capability-flag abstraction over a text embedding backend. Engines that
/// can't reach an embeddings provider (no API key configured) simply never
/// construct an implementor, and callers fall back to the token-Jaccard
/// path. Mirrors the graceful-degradation `Option<Self>` pattern used for
/// the provider's embedding client.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Option<Vec<Vec<f32>>>;
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)) as f64
}

fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    inter as f64 / union as f64
}

/// 70th-percentile of pairwise similarities, bounded to
/// `[threshold_min, threshold_max]`, used as the adaptive paraphrase
/// threshold when enough candidates exist to make a percentile meaningful.
fn adaptive_threshold(pairwise: &[f64], config: &TriangulationConfig) -> f64 {
    if pairwise.is_empty() {
        return config.paraphrase_threshold_min;
    }
    let mut sorted = pairwise.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = ((sorted.len() as f64) * 0.70).floor() as usize;
    let idx = idx.min(sorted.len() - 1);
    sorted[idx].clamp(config.paraphrase_threshold_min, config.paraphrase_threshold_max)
}

fn claim_type_for(text: &str) -> ClaimType {
    if is_claimish(text) {
        ClaimType::NumericMeasure
    } else {
        ClaimType::NewsContext
    }
}

/// Cluster claim-like items into paraphrase groups. Runs the
/// embedding-cosine path when `embedder` is available and there are enough
/// claim-like candidates to estimate an adaptive threshold (>5); otherwise
/// falls back to token-Jaccard similarity at a flat threshold. Items that
/// never join a multi-domain group are returned as singleton,
/// non-triangulated clusters so every surviving item is still addressable
/// downstream.
pub async fn cluster_items(
    items: &[EvidenceItem],
    embedder: Option<&dyn Embedder>,
    config: &TriangulationConfig,
) -> Vec<Cluster> {
    let candidate_idx: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, it)| is_claimish(&it.snippet))
        .map(|(i, _)| i)
        .collect();

    let mut clusters = Vec::new();
    let mut clustered = vec![false; items.len()];

    if !candidate_idx.is_empty() {
        let normalized: Vec<String> = candidate_idx.iter().map(|&i| normalize_for_paraphrase(&items[i].snippet)).collect();
        let numeric: Vec<BTreeSet<String>> = candidate_idx.iter().map(|&i| numeric_tokens(&items[i].snippet)).collect();

        let embeddings = if candidate_idx.len() > 5 {
            match embedder {
                Some(e) => e.embed_batch(&normalized).await,
                None => None,
            }
        } else {
            None
        };

        let n = candidate_idx.len();
        let mut pair_sims: HashMap<(usize, usize), f64> = HashMap::new();
        let mut all_sims = Vec::new();
        for a in 0..n {
            for b in (a + 1)..n {
                let sim = match &embeddings {
                    Some(vecs) => cosine_similarity(&vecs[a], &vecs[b]),
                    None => jaccard_similarity(&normalized[a], &normalized[b]),
                };
                pair_sims.insert((a, b), sim);
                all_sims.push(sim);
            }
        }

        let threshold = if embeddings.is_some() {
            adaptive_threshold(&all_sims, config)
        } else {
            config.jaccard_fallback_threshold
        };

        let mut uf = UnionFind::new(n);
        for (&(a, b), &sim) in &pair_sims {
            let mut effective = sim;
            if sim >= NEAR_MISS_FLOOR && sim < threshold {
                let shared = numeric[a].intersection(&numeric[b]).count();
                if shared >= NEAR_MISS_MIN_SHARED_NUMERIC {
                    effective = threshold;
                }
            }
            if effective >= threshold {
                uf.union(a, b);
            }
        }

        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..n {
            let root = uf.find(i);
            groups.entry(root).or_default().push(i);
        }

        for members in groups.into_values() {
            if members.len() < 2 {
                continue;
            }
            let item_indices: Vec<usize> = members.iter().map(|&m| candidate_idx[m]).collect();
            let domains: BTreeSet<String> = item_indices.iter().map(|&i| items[i].source_domain.clone()).collect();
            if domains.len() < 2 {
                continue;
            }
            let representative = item_indices
                .iter()
                .max_by(|&&a, &&b| {
                    items[a]
                        .credibility_score
                        .unwrap_or(0.0)
                        .partial_cmp(&items[b].credibility_score.unwrap_or(0.0))
                        .unwrap()
                })
                .map(|&i| truncate(&items[i].snippet, REPRESENTATIVE_MAX_LEN))
                .unwrap_or_default();
            let claim_type = claim_type_for(&representative);
            for &i in &item_indices {
                clustered[i] = true;
            }
            clusters.push(Cluster::new(item_indices, domains, representative, claim_type));
        }
    }

    for (i, item) in items.iter().enumerate() {
        if clustered[i] {
            continue;
        }
        let domains: BTreeSet<String> = [item.source_domain.clone()].into_iter().collect();
        let representative = truncate(&item.snippet, REPRESENTATIVE_MAX_LEN);
        let claim_type = claim_type_for(&representative);
        clusters.push(Cluster::new(vec![i], domains, representative, claim_type));
    }

    clusters
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        text.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, snippet: &str, domain: &str) -> EvidenceItem {
        EvidenceItem::new(url.to_string(), "title".into(), Some(snippet.into()), "test".into(), domain.into())
    }

    #[tokio::test]
    async fn jaccard_fallback_groups_similar_claims_across_domains() {
        let items = vec![
            item("https://a.example.com/1", "Tourist arrivals grew 14% in 2023 according to the report", "a.example.com"),
            item("https://b.example.com/2", "Tourist arrivals grew 14% in 2023 per official figures", "b.example.com"),
            item("https://c.example.com/3", "A local festival drew large crowds downtown", "c.example.com"),
        ];
        let config = TriangulationConfig {
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
        };
        let clusters = cluster_items(&items, None, &config).await;
        let triangulated: Vec<&Cluster> = clusters.iter().filter(|c| c.is_triangulated()).collect();
        assert_eq!(triangulated.len(), 1);
        assert_eq!(triangulated[0].item_indices.len(), 2);
    }

    #[tokio::test]
    async fn single_domain_claims_never_form_a_triangulated_cluster() {
        let items = vec![
            item("https://a.example.com/1", "Tourist arrivals grew 14% in 2023", "a.example.com"),
            item("https://a.example.com/2", "Tourist arrivals grew 14% in 2023 too", "a.example.com"),
        ];
        let config = TriangulationConfig {
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
        };
        let clusters = cluster_items(&items, None, &config).await;
        assert!(clusters.iter().all(|c| !c.is_triangulated()));
    }

    #[tokio::test]
    async fn non_claimish_items_become_singleton_clusters() {
        let items = vec![item("https://a.example.com/1", "The weather was pleasant downtown today", "a.example.com")];
        let config = TriangulationConfig {
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
        };
        let clusters = cluster_items(&items, None, &config).await;
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].item_indices, vec![0]);
    }
}
