use serde::{Deserialize, Serialize};

use eatc_router::Intent;

/// Intent-scoped gate thresholds. Four intents (`stats`,
/// `academic`, `travel`, `generic`) are given explicit values in spec.md;
/// the remaining intents are set by the same analyst judgment the
/// original's `intent_registry.py` threshold table applies per-topic
/// (tighter bars for reference/scholarly intents, looser for discovery
/// intents like `howto`/`local`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Thresholds {
    pub primary_share_floor: f64,
    pub triangulation_floor: f64,
    pub domain_cap: f64,
    /// `stats` intent's extra gates: minimum recent primary
    /// items and at least one triangulated cluster.
    pub recent_primary_min: Option<usize>,
    pub triangulated_clusters_min: Option<usize>,
}

pub fn thresholds_for(intent: Intent) -> Thresholds {
    let (primary_share_floor, triangulation_floor, domain_cap) = match intent {
        Intent::Stats => (0.50, 0.40, 0.25),
        Intent::Academic => (0.50, 0.40, 0.25),
        Intent::Medical => (0.50, 0.40, 0.25),
        Intent::Regulatory => (0.45, 0.35, 0.30),
        Intent::Encyclopedia => (0.40, 0.35, 0.30),
        Intent::News => (0.35, 0.30, 0.35),
        Intent::Travel => (0.30, 0.25, 0.35),
        Intent::Product => (0.30, 0.25, 0.40),
        Intent::Howto => (0.25, 0.20, 0.40),
        Intent::Local => (0.25, 0.20, 0.40),
        Intent::Generic => (0.50, 0.45, 0.25),
    };

    let (recent_primary_min, triangulated_clusters_min) =
        if matches!(intent, Intent::Stats) { (Some(3), Some(1)) } else { (None, None) };

    Thresholds { primary_share_floor, triangulation_floor, domain_cap, recent_primary_min, triangulated_clusters_min }
}

/// Threshold set used on the single degraded-recovery retry:
/// the paraphrase-cluster threshold loosens, but the gate floors
/// themselves are unchanged — a degraded run still has to clear the same
/// bar, just with more clusters able to form.
pub const DEGRADED_PARAPHRASE_THRESHOLD: f64 = 0.34;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_intent_has_extra_gates() {
        let t = thresholds_for(Intent::Stats);
        assert_eq!(t.recent_primary_min, Some(3));
        assert_eq!(t.triangulated_clusters_min, Some(1));
    }

    #[test]
    fn generic_matches_spec_example_values() {
        let t = thresholds_for(Intent::Generic);
        assert_eq!(t.primary_share_floor, 0.50);
        assert_eq!(t.triangulation_floor, 0.45);
        assert_eq!(t.domain_cap, 0.25);
    }
}
