use std::collections::{HashMap, HashSet};

use ahash::AHasher;
use eatc_common::types::EvidenceItem;
use sha2::{Digest, Sha256};
use std::hash::Hasher;

const SHINGLE_SIZE: usize = 6;
const NUM_PERMUTATIONS: usize = 128;
const LSH_THRESHOLD: f64 = 0.92;
const TITLE_DUPLICATE_THRESHOLD: f64 = 0.95;

/// SHA-256 of normalized text, used as an exact-duplicate key ahead of the
/// near-duplicate MinHash pass.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().to_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn shingles(text: &str, size: usize) -> HashSet<u64> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return HashSet::new();
    }
    if tokens.len() <= size {
        let mut hasher = AHasher::default();
        hasher.write(tokens.join(" ").as_bytes());
        return HashSet::from([hasher.finish()]);
    }
    tokens
        .windows(size)
        .map(|w| {
            let mut hasher = AHasher::default();
            hasher.write(w.join(" ").as_bytes());
            hasher.finish()
        })
        .collect()
}

/// 128-permutation MinHash signature over 6-gram shingles, at the same
/// parameters as a typical MinHash/MinHashLSH near-duplicate detector.
struct MinHashSig(Vec<u64>);

fn minhash(shingles: &HashSet<u64>) -> MinHashSig {
    let mut sig = vec![u64::MAX; NUM_PERMUTATIONS];
    for &shingle in shingles {
        for (perm_idx, slot) in sig.iter_mut().enumerate() {
            // Cheap universal-hash-family stand-in for datasketch's
            // per-permutation hash functions: mix the shingle value with a
            // distinct odd multiplier per permutation index.
            let multiplier = (perm_idx as u64).wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(1) | 1;
            let mixed = shingle.wrapping_mul(multiplier) ^ (shingle.rotate_left((perm_idx % 63) as u32));
            if mixed < *slot {
                *slot = mixed;
            }
        }
    }
    MinHashSig(sig)
}

fn estimated_jaccard(a: &MinHashSig, b: &MinHashSig) -> f64 {
    let matches = a.0.iter().zip(b.0.iter()).filter(|(x, y)| x == y).count();
    matches as f64 / NUM_PERMUTATIONS as f64
}

/// Canonical-URL + content-hash + MinHash near-duplicate collapse. Items
/// are assumed already URL-canonicalized upstream. Retains, per
/// duplicate group, the item with the highest `credibility_score` (ties
/// broken by earliest `collected_at`).
pub fn dedup_items(mut items: Vec<EvidenceItem>) -> Vec<EvidenceItem> {
    // Exact URL dedup first.
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut keep = vec![true; items.len()];
    for (idx, item) in items.iter().enumerate() {
        match by_url.get(&item.url) {
            Some(&existing) => {
                if !better(&items[existing], item) {
                    keep[idx] = false;
                } else {
                    keep[existing] = false;
                    by_url.insert(item.url.clone(), idx);
                }
            }
            None => {
                by_url.insert(item.url.clone(), idx);
            }
        }
    }

    // Exact content-hash dedup among URL survivors.
    let mut by_hash: HashMap<String, usize> = HashMap::new();
    for idx in 0..items.len() {
        if !keep[idx] {
            continue;
        }
        let Some(hash) = items[idx].content_hash.clone() else { continue };
        match by_hash.get(&hash) {
            Some(&existing) => {
                if !better(&items[existing], &items[idx]) {
                    keep[idx] = false;
                } else {
                    keep[existing] = false;
                    by_hash.insert(hash, idx);
                }
            }
            None => {
                by_hash.insert(hash, idx);
            }
        }
    }

    // Near-duplicate MinHash/LSH pass over remaining items' snippets.
    let surviving: Vec<usize> = (0..items.len()).filter(|&i| keep[i]).collect();
    let sigs: Vec<MinHashSig> = surviving
        .iter()
        .map(|&i| minhash(&shingles(&items[i].snippet, SHINGLE_SIZE)))
        .collect();

    for a in 0..surviving.len() {
        if !keep[surviving[a]] {
            continue;
        }
        for b in (a + 1)..surviving.len() {
            if !keep[surviving[b]] {
                continue;
            }
            if estimated_jaccard(&sigs[a], &sigs[b]) >= LSH_THRESHOLD {
                let ia = surviving[a];
                let ib = surviving[b];
                if better(&items[ia], &items[ib]) {
                    keep[ib] = false;
                } else {
                    keep[ia] = false;
                }
            }
        }
    }

    // Same-domain title-match pass: catches syndicated copies whose
    // tracking-param variance survived canonicalization and whose
    // snippets diverge too much for the shingle pass to flag, mirroring
    // the teacher's jaro_winkler name-matching for near-duplicate graph
    // entities.
    for a in 0..surviving.len() {
        if !keep[surviving[a]] {
            continue;
        }
        for b in (a + 1)..surviving.len() {
            let (ia, ib) = (surviving[a], surviving[b]);
            if !keep[ib] || items[ia].source_domain != items[ib].source_domain {
                continue;
            }
            let sim = strsim::jaro_winkler(&items[ia].title.to_lowercase(), &items[ib].title.to_lowercase());
            if sim >= TITLE_DUPLICATE_THRESHOLD {
                if better(&items[ia], &items[ib]) {
                    keep[ib] = false;
                } else {
                    keep[ia] = false;
                }
            }
        }
    }

    let mut idx = 0;
    items.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
    items
}

/// `true` if `candidate` should win over `incumbent` when collapsing a
/// duplicate pair: higher credibility wins, ties go to whichever was
/// collected first.
fn better(incumbent: &EvidenceItem, candidate: &EvidenceItem) -> bool {
    let inc_score = incumbent.credibility_score.unwrap_or(0.0);
    let cand_score = candidate.credibility_score.unwrap_or(0.0);
    if (cand_score - inc_score).abs() > f64::EPSILON {
        return cand_score > inc_score;
    }
    candidate.collected_at < incumbent.collected_at
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, snippet: &str, credibility: f64) -> EvidenceItem {
        let mut it = EvidenceItem::new(url.to_string(), "title".into(), Some(snippet.into()), "test".into(), "example.com".into());
        it.credibility_score = Some(credibility);
        it
    }

    #[test]
    fn exact_url_duplicates_collapse_keeping_higher_credibility() {
        let items = vec![item("https://a.example.com/x", "one two three", 0.4), item("https://a.example.com/x", "one two three", 0.8)];
        let out = dedup_items(items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].credibility_score, Some(0.8));
    }

    #[test]
    fn near_duplicate_snippets_collapse() {
        let long = "Arrivals in the region grew fourteen percent during the reporting period according to national tourism statistics released this quarter";
        let items = vec![
            item("https://a.example.com/1", long, 0.5),
            item("https://b.example.com/2", long, 0.6),
        ];
        let out = dedup_items(items);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn same_domain_near_identical_titles_collapse() {
        let mut a = item("https://a.example.com/1?ref=rss", "A tourism board press release noted strong arrivals", 0.5);
        a.title = "Global tourism arrivals hit record high in 2024".into();
        let mut b = item("https://a.example.com/1?ref=newsletter", "Recovery continued across most regions this year", 0.6);
        b.title = "Global tourism arrivals hit record high in 2024!".into();
        let out = dedup_items(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].credibility_score, Some(0.6));
    }

    #[test]
    fn distinct_content_is_preserved() {
        let items = vec![
            item("https://a.example.com/1", "Arrivals grew fourteen percent in the region", 0.5),
            item("https://b.example.com/2", "A festival was held downtown last weekend", 0.6),
        ];
        let out = dedup_items(items);
        assert_eq!(out.len(), 2);
    }
}
