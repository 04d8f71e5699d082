//! End-to-end pipeline runs against a fake `Search` adapter and a local
//! `wiremock` server standing in for the live web (no outbound network
//! calls), preferring a real-but-local backend over a mocked one wherever
//! the target supports it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use eatc_common::config::Credentials;
use eatc_common::types::{Depth, EvidenceItem, RunRequest};
use eatc_engine::{EngineConfig, Pipeline, RunOutcome};
use eatc_providers::{ProviderContext, Search};

/// Returns a fixed set of evidence items pointing at a local mock server
/// instead of issuing a real provider call.
struct FakeSearch {
    urls: Vec<(String, String)>,
}

#[async_trait]
impl Search for FakeSearch {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn licensing(&self) -> &'static str {
        "cc-by-sa"
    }

    async fn search(&self, _query: &str, limit: usize, _ctx: &ProviderContext<'_>) -> Vec<EvidenceItem> {
        self.urls
            .iter()
            .take(limit)
            .map(|(url, title)| EvidenceItem::new(url.clone(), title.clone(), None, self.name().to_string(), "placeholder".into()))
            .collect()
    }
}

fn test_config(output_dir: &std::path::Path) -> EngineConfig {
    let mut system = eatc_common::config::SystemConfig::defaults();
    system.gates.strict_mode = false;
    system.concurrency.fanout_pool_size = 4;
    let _ = output_dir;
    EngineConfig { system, credentials: Credentials::default() }
}

fn request(output_dir: &std::path::Path, providers: Option<Vec<String>>) -> RunRequest {
    RunRequest {
        topic: "desert bighorn sheep population trends".into(),
        intent_hint: None,
        depth: Depth::Rapid,
        budget_seconds: 20,
        strict: false,
        output_dir: output_dir.to_string_lossy().into_owned(),
        providers,
    }
}

#[tokio::test]
async fn run_with_no_search_results_reports_no_evidence() {
    let dir = tempfile::tempdir().unwrap();
    let adapters: HashMap<&'static str, Arc<dyn Search>> = HashMap::new();
    let pipeline = Pipeline::with_adapters(test_config(dir.path()), adapters);

    let req = request(dir.path(), Some(vec!["wikipedia".into()]));
    let outcome = pipeline.run(&req).await.unwrap();
    assert!(matches!(outcome, RunOutcome::NoEvidence));
}

#[tokio::test]
async fn run_fetches_and_writes_every_output_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Desert Bighorn Sheep</title></head><body><p>\
             Desert bighorn sheep population trends have been tracked across \
             the Mojave and Sonoran deserts for several decades by wildlife \
             agencies monitoring herd counts.</p></body></html>",
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let fake = FakeSearch { urls: vec![(format!("{}/article", server.uri()), "Desert Bighorn Sheep".to_string())] };
    let mut adapters: HashMap<&'static str, Arc<dyn Search>> = HashMap::new();
    adapters.insert("wikipedia", Arc::new(fake));

    let pipeline = Pipeline::with_adapters(test_config(dir.path()), adapters);
    let req = request(dir.path(), Some(vec!["wikipedia".into()]));

    let outcome = pipeline.run(&req).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Passed { .. } | RunOutcome::Degraded { .. }));

    let cards = std::fs::read_to_string(dir.path().join("evidence_cards.jsonl")).unwrap();
    assert!(!cards.trim().is_empty());
    let first: serde_json::Value = serde_json::from_str(cards.lines().next().unwrap()).unwrap();
    assert_eq!(first["provider"], "wikipedia");

    let clusters = std::fs::read_to_string(dir.path().join("clusters.json")).unwrap();
    let _: serde_json::Value = serde_json::from_str(&clusters).unwrap();

    let metrics = std::fs::read_to_string(dir.path().join("metrics.json")).unwrap();
    let metrics_value: serde_json::Value = serde_json::from_str(&metrics).unwrap();
    assert!(metrics_value.get("passed").is_some());

    let provider_stats = std::fs::read_to_string(dir.path().join("provider_stats.json")).unwrap();
    let stats_value: serde_json::Value = serde_json::from_str(&provider_stats).unwrap();
    assert!(stats_value.get("wikipedia").is_some());

    let run_log = std::fs::read_to_string(dir.path().join("run.log.jsonl")).unwrap();
    assert!(run_log.lines().count() >= 5);
}

#[tokio::test]
async fn explicit_provider_override_restricts_fan_out_to_named_providers() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeSearch { urls: vec![] };
    let mut adapters: HashMap<&'static str, Arc<dyn Search>> = HashMap::new();
    adapters.insert("wikipedia", Arc::new(fake));
    adapters.insert("crossref", Arc::new(FakeSearch { urls: vec![] }));

    let pipeline = Pipeline::with_adapters(test_config(dir.path()), adapters);
    // Only "wikipedia" is a valid registered adapter name; "not-a-real-provider"
    // is silently dropped rather than causing a crash.
    let req = request(dir.path(), Some(vec!["wikipedia".into(), "not-a-real-provider".into()]));

    let outcome = pipeline.run(&req).await.unwrap();
    assert!(matches!(outcome, RunOutcome::NoEvidence));
}
