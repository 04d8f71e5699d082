use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Shape of the representative claim in a cluster, used by contradiction
/// heuristics to pick a comparison strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    NumericMeasure,
    MechanismOrTheory,
    OpinionAdvocacy,
    NewsContext,
}

/// A group of item indices (into the run's evidence item slice) judged to
/// express the same underlying claim.
///
/// Created by the paraphrase clusterer; annotated by contradiction
/// filtering; consumed by metrics and gate evaluation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cluster {
    /// Indices into the run's item list. A multiset: duplicate items within
    /// one cluster are not deduplicated here (dedup already ran upstream).
    pub item_indices: Vec<usize>,
    /// Canonical domains across every member item.
    pub domains: BTreeSet<String>,
    pub representative_claim: String,
    pub claim_type: ClaimType,

    #[serde(default)]
    pub needs_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_reason: Option<String>,
}

impl Cluster {
    pub fn new(item_indices: Vec<usize>, domains: BTreeSet<String>, representative_claim: String, claim_type: ClaimType) -> Self {
        Self {
            item_indices,
            domains,
            representative_claim,
            claim_type,
            needs_review: false,
            dropped_reason: None,
        }
    }

    /// Invariant for a "triangulated" cluster: at least two
    /// distinct canonical domains among its members.
    pub fn is_triangulated(&self) -> bool {
        self.domains.len() >= 2
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped_reason.is_some()
    }
}
