//! Output file writers for the three fixed run artifacts:
//! `evidence_cards.jsonl`, `metrics.json`, `clusters.json`. Every write is
//! tmp-file + rename for atomicity, matching the discipline
//! `eatc-http`'s on-disk cache already applies.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use eatc_common::error::EatcError;
use eatc_common::types::{Cluster, EvidenceItem};
use eatc_metrics::GateReport;

fn atomic_write(path: &Path, contents: &str) -> Result<(), EatcError> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp_path).map_err(|e| EatcError::OutputWrite(format!("creating {}: {e}", tmp_path.display())))?;
        file.write_all(contents.as_bytes()).map_err(|e| EatcError::OutputWrite(e.to_string()))?;
        file.sync_all().ok();
    }
    std::fs::rename(&tmp_path, path).map_err(|e| EatcError::OutputWrite(format!("renaming into {}: {e}", path.display())))?;
    Ok(())
}

/// Write `evidence_cards.jsonl`: one JSON object per line, UTF-8 without
/// BOM, LF endings, ordered by descending `confidence` so object order
/// doubles as the final ranking.
pub fn write_evidence_cards(items: &[EvidenceItem], output_dir: &Path) -> Result<(), EatcError> {
    let mut ordered: Vec<&EvidenceItem> = items.iter().collect();
    ordered.sort_by(|a, b| {
        let ca = a.confidence.unwrap_or(0.0);
        let cb = b.confidence.unwrap_or(0.0);
        cb.partial_cmp(&ca).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut body = String::new();
    for item in ordered {
        let line = serde_json::to_string(item).map_err(EatcError::Serialization)?;
        body.push_str(&line);
        body.push('\n');
    }
    atomic_write(&output_dir.join("evidence_cards.jsonl"), &body)
}

/// Cluster as serialized into `clusters.json`: `indices`, not the
/// in-memory `item_indices`.
#[derive(Serialize)]
struct ClusterOutput<'a> {
    indices: &'a [usize],
    domains: &'a std::collections::BTreeSet<String>,
    representative_claim: &'a str,
    claim_type: eatc_common::types::ClaimType,
    is_triangulated: bool,
    meta: ClusterMeta,
}

#[derive(Serialize)]
struct ClusterMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    needs_review: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dropped_reason: Option<String>,
}

pub fn write_clusters(clusters: &[Cluster], output_dir: &Path) -> Result<(), EatcError> {
    let outputs: Vec<ClusterOutput> = clusters
        .iter()
        .map(|c| ClusterOutput {
            indices: &c.item_indices,
            domains: &c.domains,
            representative_claim: &c.representative_claim,
            claim_type: c.claim_type,
            is_triangulated: c.is_triangulated(),
            meta: ClusterMeta {
                needs_review: if c.needs_review { Some(true) } else { None },
                dropped_reason: c.dropped_reason.clone(),
            },
        })
        .collect();
    let body = serde_json::to_string_pretty(&outputs).map_err(EatcError::Serialization)?;
    atomic_write(&output_dir.join("clusters.json"), &body)
}

/// `metrics.json`: the full gate report (metrics + pass flags +
/// `thresholds_used`).
pub fn write_metrics(report: &GateReport, output_dir: &Path) -> Result<(), EatcError> {
    let body = serde_json::to_string_pretty(report).map_err(EatcError::Serialization)?;
    atomic_write(&output_dir.join("metrics.json"), &body)
}

/// Per-provider attempt/error snapshot, written alongside the three fixed
/// artifacts as ambient diagnostics, purely additive.
pub fn write_provider_stats(stats: &BTreeMap<String, Value>, output_dir: &Path) -> Result<(), EatcError> {
    let body = serde_json::to_string_pretty(stats).map_err(EatcError::Serialization)?;
    atomic_write(&output_dir.join("provider_stats.json"), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eatc_common::types::ClaimType;
    use std::collections::BTreeSet;

    #[test]
    fn evidence_cards_are_written_sorted_by_confidence_desc() {
        let dir = tempfile::tempdir().unwrap();
        let mut low = EvidenceItem::new("https://a.example.com/1".into(), "a".into(), Some("s".into()), "p".into(), "a.example.com".into());
        low.confidence = Some(0.2);
        let mut high = EvidenceItem::new("https://b.example.com/2".into(), "b".into(), Some("s".into()), "p".into(), "b.example.com".into());
        high.confidence = Some(0.9);
        write_evidence_cards(&[low, high], dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("evidence_cards.jsonl")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"b.example.com\""));
        assert!(!contents.starts_with('\u{feff}'));
    }

    #[test]
    fn clusters_json_uses_spec_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let domains: BTreeSet<String> = ["a.example.com".into(), "b.example.com".into()].into_iter().collect();
        let cluster = Cluster::new(vec![0, 1], domains, "claim".into(), ClaimType::NumericMeasure);
        write_clusters(&[cluster], dir.path()).unwrap();
        let contents = std::fs::read_to_string(dir.path().join("clusters.json")).unwrap();
        assert!(contents.contains("\"indices\""));
        assert!(contents.contains("\"is_triangulated\""));
        assert!(!contents.contains("\"item_indices\""));
    }
}
