use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ItemId;

/// Discipline classification used for `domain_prior` lookups in confidence
/// recompute. Not part of the persisted JSONL schema — supplementary
/// texture only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    General,
    Science,
    Medicine,
    LawPolicy,
    FinanceEcon,
    TechSoftware,
    Security,
    TravelTourism,
    ClimateEnv,
}

/// Where an item stands relative to the rest of its cluster once
/// contradiction filtering has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Supports,
    Disputes,
    Neutral,
}

/// Terminal disposition recorded for an item that did not survive the
/// pipeline, for diagnostics in the run log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    FetchBlocked,
    ParseEmpty,
    Duplicate,
    OffTopic,
    ContradictedDrop,
    Kept,
}

/// A single piece of evidence pulled from one provider.
///
/// Created by a provider adapter; mutated only by enrichment steps
/// (quote extraction, primary-source promotion, confidence recompute) and
/// immutable after gate evaluation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: ItemId,
    pub url: String,
    pub title: String,
    /// Non-empty extract. Fallback chain enforced at construction time:
    /// extracted text -> provided snippet -> title.
    pub snippet: String,
    pub provider: String,
    /// `canonical_domain(url)` — see [`crate::domain::canonical_domain`].
    pub source_domain: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arxiv_id: Option<String>,
    /// Exact sentence pulled from the source, set by the quote extractor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_span: Option<String>,
    /// SHA-256 of fetched content, set once content normalization retrieves
    /// the full body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reachability: Option<f64>,
    #[serde(default)]
    pub is_primary_source: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credibility_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance: Option<Stance>,
    /// Set true once the item lands in a cluster with >=2 distinct domains.
    #[serde(default)]
    pub triangulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licensing: Option<String>,

    /// Populated by contradiction filtering when its cluster is flagged
    /// `needs_review`. Named in the JSONL optional-field list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controversy_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disputed_by: Vec<String>,

    /// Supplementary, unexported classification (see [`Discipline`]).
    #[serde(skip)]
    pub discipline: Option<Discipline>,

    pub collected_at: DateTime<Utc>,

    /// Freeform provider-specific metadata that doesn't warrant a typed
    /// field (mirrors the flatten-a-value-map pattern used across the
    /// provider API request/response types).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl EvidenceItem {
    /// Construct a new item, applying the snippet fallback chain invariant
    /// (extracted text -> provided snippet -> title) so every persisted
    /// item has a non-empty snippet.
    pub fn new(
        url: String,
        title: String,
        snippet: Option<String>,
        provider: String,
        source_domain: String,
    ) -> Self {
        let snippet = snippet
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| title.clone());
        Self {
            id: ItemId::new(),
            url,
            title,
            snippet,
            provider,
            source_domain,
            date: None,
            author: None,
            doi: None,
            pmid: None,
            arxiv_id: None,
            quote_span: None,
            content_hash: None,
            reachability: None,
            is_primary_source: false,
            credibility_score: None,
            relevance_score: None,
            confidence: None,
            stance: None,
            triangulated: false,
            licensing: None,
            controversy_score: None,
            disputed_by: Vec::new(),
            discipline: None,
            collected_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}
