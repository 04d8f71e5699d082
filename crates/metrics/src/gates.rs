use serde::{Deserialize, Serialize};

use eatc_router::Intent;

use crate::thresholds::{thresholds_for, Thresholds};
use crate::Metrics;

/// The thresholds actually applied to a gate evaluation, echoed back into
/// `metrics.json` so a reader can see which intent's table supplied them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThresholdsUsed {
    pub intent: String,
    pub primary_share_floor: f64,
    pub triangulation_floor: f64,
    pub domain_cap: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateReport {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub pass_primary: bool,
    pub pass_triangulation: bool,
    pub pass_concentration: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_stats_extra: Option<bool>,
    pub passed: bool,
    pub thresholds_used: ThresholdsUsed,
}

/// Evaluate a computed metrics set against `intent`'s threshold table.
/// `stats` additionally requires `recent_primary_count >= 3`
/// and `triangulated_clusters >= 1`.
pub fn evaluate_gates(metrics: &Metrics, intent: Intent) -> GateReport {
    let Thresholds { primary_share_floor, triangulation_floor, domain_cap, recent_primary_min, triangulated_clusters_min } =
        thresholds_for(intent);

    let pass_primary = metrics.primary_share >= primary_share_floor;
    let pass_triangulation = metrics.triangulation_rate >= triangulation_floor;
    let pass_concentration = metrics.domain_concentration <= domain_cap;

    let pass_stats_extra = if recent_primary_min.is_some() || triangulated_clusters_min.is_some() {
        let recent_ok = recent_primary_min.map(|min| metrics.recent_primary_count >= min).unwrap_or(true);
        let clusters_ok = triangulated_clusters_min.map(|min| metrics.triangulated_clusters >= min).unwrap_or(true);
        Some(recent_ok && clusters_ok)
    } else {
        None
    };

    let passed = pass_primary && pass_triangulation && pass_concentration && pass_stats_extra.unwrap_or(true);

    GateReport {
        metrics: metrics.clone(),
        pass_primary,
        pass_triangulation,
        pass_concentration,
        pass_stats_extra,
        passed,
        thresholds_used: ThresholdsUsed {
            intent: intent.as_str().to_string(),
            primary_share_floor,
            triangulation_floor,
            domain_cap,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_metrics() -> Metrics {
        Metrics {
            primary_share: 0.6,
            triangulation_rate: 0.5,
            domain_concentration: 0.2,
            unique_domains: 5,
            credible_cards: 4,
            provider_error_rate: 0.0,
            provider_entropy: 0.8,
            recent_primary_count: 3,
            triangulated_clusters: 2,
            sample_sizes: Default::default(),
        }
    }

    #[test]
    fn generic_gate_passes_with_strong_metrics() {
        let report = evaluate_gates(&passing_metrics(), Intent::Generic);
        assert!(report.passed);
    }

    #[test]
    fn stats_gate_fails_without_recent_primary_items() {
        let mut metrics = passing_metrics();
        metrics.recent_primary_count = 1;
        let report = evaluate_gates(&metrics, Intent::Stats);
        assert!(!report.passed);
        assert_eq!(report.pass_stats_extra, Some(false));
    }

    #[test]
    fn concentration_above_cap_fails_gate() {
        let mut metrics = passing_metrics();
        metrics.domain_concentration = 0.9;
        let report = evaluate_gates(&metrics, Intent::Generic);
        assert!(!report.passed);
        assert!(!report.pass_concentration);
    }
}
