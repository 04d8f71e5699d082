//! End-to-end orchestration, wiring every other crate into one run: a
//! struct holding the long-lived clients, one `run` entry point driving a
//! deterministic sequence of stages, `tracing::info_span!` per run and
//! `metrics::counter!`/`histogram!` at each stage boundary.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use eatc_common::config::{Credentials, SystemConfig};
use eatc_common::error::EatcError;
use eatc_common::types::{Cluster, Depth, EvidenceItem, ProviderStatsRegistry, RunContext, RunRequest};
use eatc_http::{Deadline, HttpClient};
use eatc_metrics::GateReport;
use eatc_providers::Search;
use eatc_router::RouteDecision;
use eatc_scheduler::SchedulerConfig;

use crate::config::EngineConfig;
use crate::primary_search::{AdapterPrimarySearch, HttpPrimaryExtract};
use crate::runlog::RunLog;

/// Final disposition of a run, mapped to the CLI's exit codes.
#[derive(Clone, Debug)]
pub enum RunOutcome {
    Passed { report: GateReport },
    Degraded { report: GateReport },
    NoEvidence,
}

/// Depth-scaled fan-out knobs. `rapid` trades recall for latency; `deep`
/// spends more of the budget on query breadth and primary-source
/// backfill passes.
struct DepthPlan {
    query_variants: usize,
    limit_per_task: usize,
    max_primary_fill_passes: usize,
}

fn depth_plan(depth: Depth) -> DepthPlan {
    match depth {
        Depth::Rapid => DepthPlan { query_variants: 1, limit_per_task: 5, max_primary_fill_passes: 0 },
        Depth::Standard => DepthPlan { query_variants: 2, limit_per_task: 8, max_primary_fill_passes: 1 },
        Depth::Deep => DepthPlan { query_variants: 3, limit_per_task: 12, max_primary_fill_passes: 2 },
    }
}

/// Query variants issued against every routed provider: the raw topic
/// plus, at `standard`/`deep` depth, a quoted-phrase variant and (at
/// `deep` only) a year-qualified variant, which upstream full-text
/// search/statistics APIs generally treat as a narrower refinement.
fn build_queries(topic: &str, plan: &DepthPlan) -> Vec<String> {
    let mut queries = vec![topic.to_string()];
    if plan.query_variants >= 2 {
        queries.push(format!("\"{}\"", topic.trim()));
    }
    if plan.query_variants >= 3 {
        let year = Utc::now().format("%Y").to_string();
        queries.push(format!("{topic} {year}"));
    }
    queries
}

fn relevance_score(topic: &str, snippet: &str) -> f64 {
    let topic_tokens: std::collections::HashSet<String> =
        topic.to_lowercase().split_whitespace().map(str::to_string).collect();
    if topic_tokens.is_empty() {
        return 0.5;
    }
    let snippet_lower = snippet.to_lowercase();
    let hits = topic_tokens.iter().filter(|t| snippet_lower.contains(t.as_str())).count();
    (hits as f64 / topic_tokens.len() as f64).min(1.0)
}

/// Long-lived clients and configuration threaded through every run. One
/// instance is built once at CLI startup and reused across runs.
pub struct Pipeline {
    config: EngineConfig,
    adapters: HashMap<&'static str, Arc<dyn Search>>,
}

/// Carries provider error/attempt totals and the gate verdict out of
/// [`Pipeline::triangulate_and_gate`] alongside the (possibly widened)
/// cluster set.
struct GateOutcome {
    clusters: Vec<Cluster>,
    report: GateReport,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        let adapters: HashMap<&'static str, Arc<dyn Search>> =
            eatc_providers::all_adapters().into_iter().map(|a| (a.name(), a)).collect();
        Self { config, adapters }
    }

    /// Construct against an explicit adapter set instead of the built-in
    /// registry — the seam integration tests use to substitute a fake
    /// `Search` implementation pointed at a local server rather than the
    /// real provider hosts.
    pub fn with_adapters(config: EngineConfig, adapters: HashMap<&'static str, Arc<dyn Search>>) -> Self {
        Self { config, adapters }
    }

    /// Run one request end to end, writing every output artifact before
    /// returning. Never propagates a mid-run error upward as a hard
    /// failure except for output-write I/O errors; upstream/provider
    /// failures degrade the result instead of aborting it.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome, EatcError> {
        let span = tracing::info_span!("run", topic = %request.topic, depth = ?request.depth);
        let _enter = span.enter();

        crate::config::validate_request(request)?;

        let run_ctx = RunContext::new(request);
        let run_log = RunLog::open(std::path::Path::new(&request.output_dir))?;
        run_log.record("startup", "run started", serde_json::json!({"topic": request.topic, "depth": format!("{:?}", request.depth)}));

        let deadline = Deadline::from_budget_secs(request.budget_seconds);
        let cache_dir = std::path::Path::new(&request.output_dir).join(".cache");
        let http = Arc::new(HttpClient::new(&self.config.system.http, cache_dir));
        let credentials = Arc::new(self.config.credentials.clone());

        let intent_hint = request.intent_hint.as_deref().and_then(eatc_router::Intent::from_str_loose);
        let decision: RouteDecision = eatc_router::route(&request.topic, intent_hint, &credentials);

        // An explicit `providers` override on the request bypasses the
        // router's tier resolution entirely, restricted to names this
        // binary actually has an adapter for.
        let providers: Vec<&'static str> = match &request.providers {
            Some(explicit) => explicit
                .iter()
                .filter_map(|name| self.adapters.keys().find(|k| k.eq_ignore_ascii_case(name)).copied())
                .collect(),
            None => decision.providers.clone(),
        };
        run_log.record("router", "routed", serde_json::json!({"intent": decision.primary_intent.as_str(), "providers": providers}));

        eatc_scheduler::configure_provider_circuits(&http, &providers);

        let plan = depth_plan(request.depth);
        let queries = build_queries(&request.topic, &plan);
        let tasks = eatc_scheduler::build_tasks(&providers, &queries, plan.limit_per_task);

        let scheduler_config = SchedulerConfig { max_concurrency: self.config.system.concurrency.fanout_pool_size, ..Default::default() };
        let raw_items = eatc_scheduler::fan_out(
            tasks,
            &self.adapters,
            Arc::clone(&http),
            Arc::clone(&credentials),
            run_ctx.counters.clone(),
            deadline,
            &scheduler_config,
        )
        .await;
        run_log.record("fanout", "fan-out complete", serde_json::json!({"raw_items": raw_items.len()}));

        if raw_items.is_empty() {
            run_log.record("gates", "no evidence collected", serde_json::json!({}));
            return Ok(RunOutcome::NoEvidence);
        }

        let mut items = self.normalize_items(raw_items, &request.topic, &http, &credentials, deadline).await;
        run_log.record("normalize", "normalized", serde_json::json!({"items": items.len()}));

        items = eatc_triangulate::dedup_items(items);
        run_log.record("dedup", "deduplicated", serde_json::json!({"items": items.len()}));

        if items.is_empty() {
            run_log.record("gates", "no evidence survived dedup", serde_json::json!({}));
            return Ok(RunOutcome::NoEvidence);
        }

        let outcome = self
            .triangulate_and_gate(&mut items, &decision, request, &run_log, &self.config.system, &run_ctx.counters, &http, &credentials, deadline, false)
            .await;

        let outcome = if outcome.report.passed || !request.strict {
            outcome
        } else {
            // Strict mode, gates failed: one degraded-recovery retry with
            // a loosened paraphrase threshold, re-running clustering
            // through gate evaluation.
            run_log.record("gates", "strict gate failed, retrying degraded", serde_json::json!({}));
            self.triangulate_and_gate(&mut items, &decision, request, &run_log, &self.config.system, &run_ctx.counters, &http, &credentials, deadline, true)
                .await
        };

        self.write_outputs(&items, &outcome.clusters, &outcome.report, &run_ctx, &request.output_dir)?;
        run_log.record("gates", "run complete", serde_json::json!({"passed": outcome.report.passed}));

        Ok(if outcome.report.passed {
            RunOutcome::Passed { report: outcome.report }
        } else {
            RunOutcome::Degraded { report: outcome.report }
        })
    }

    /// Canonicalize each item's URL, fetch and extract its content
    /// (bounded concurrency so a slow host can't stall the whole stage),
    /// and assign the scores every downstream stage depends on.
    async fn normalize_items(
        &self,
        raw_items: Vec<EvidenceItem>,
        topic: &str,
        http: &Arc<HttpClient>,
        credentials: &Arc<Credentials>,
        deadline: Deadline,
    ) -> Vec<EvidenceItem> {
        use eatc_triangulate::dedup::content_hash;
        use tokio::sync::Semaphore;

        let semaphore = Arc::new(Semaphore::new(self.config.system.concurrency.fanout_pool_size.max(1)));
        let max_pdf_pages = self.config.system.http.pdf.max_pages as usize;

        let mut handles = Vec::with_capacity(raw_items.len());
        for mut item in raw_items {
            item.url = eatc_normalize::canonicalize_url(&item.url);
            let domain = url::Url::parse(&item.url).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_default();
            item.source_domain = eatc_common::domain::canonical_domain(&domain);

            let http = Arc::clone(http);
            let credentials = Arc::clone(credentials);
            let semaphore = Arc::clone(&semaphore);
            let topic = topic.to_string();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.ok();
                if deadline.is_expired() {
                    return item;
                }
                let fetched = eatc_normalize::fetch_and_extract(&http, &item.url, &credentials, max_pdf_pages, deadline).await;
                if !fetched.fetch_failed && !fetched.text.trim().is_empty() {
                    item.content_hash = Some(content_hash(&fetched.text));
                    if let Some(quote) = fetched.quote.clone() {
                        item.quote_span = Some(quote.clone());
                        item.snippet = quote;
                    } else if fetched.text.len() > item.snippet.len() {
                        item.snippet = fetched.text.chars().take(500).collect();
                    }
                    if let Some(title) = fetched.title {
                        if !title.trim().is_empty() {
                            item.title = title;
                        }
                    }
                }
                item.credibility_score = Some(eatc_triangulate::domain_prior(&item.source_domain));
                item.relevance_score = Some(relevance_score(&topic, &item.snippet));
                item
            }));
        }

        let mut items = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(item) = handle.await {
                items.push(item);
            }
        }
        items
    }

    #[cfg(feature = "embeddings")]
    fn build_embedder(&self, system: &SystemConfig) -> Option<crate::embeddings::OpenAiEmbedder> {
        crate::embeddings::OpenAiEmbedder::from_env(system.embeddings.clone())
    }

    /// Cluster, filter contradictions, enrich with primary sources,
    /// recompute confidence, compute metrics and evaluate gates.
    /// `degraded` selects the loosened paraphrase threshold used on the
    /// single strict-mode retry.
    #[allow(clippy::too_many_arguments)]
    async fn triangulate_and_gate(
        &self,
        items: &mut Vec<EvidenceItem>,
        decision: &RouteDecision,
        request: &RunRequest,
        run_log: &RunLog,
        system: &SystemConfig,
        counters: &ProviderStatsRegistry,
        http: &Arc<HttpClient>,
        credentials: &Arc<Credentials>,
        deadline: Deadline,
        degraded: bool,
    ) -> GateOutcome {
        let mut tri_config = system.triangulation.clone();
        if degraded {
            tri_config.paraphrase_threshold_override = Some(tri_config.degraded_paraphrase_threshold);
        }

        #[cfg(feature = "embeddings")]
        let embedder = self.build_embedder(system);
        #[cfg(feature = "embeddings")]
        let embedder_ref: Option<&dyn eatc_triangulate::Embedder> = embedder.as_ref().map(|e| e as &dyn eatc_triangulate::Embedder);
        #[cfg(not(feature = "embeddings"))]
        let embedder_ref: Option<&dyn eatc_triangulate::Embedder> = None;

        let mut clusters = eatc_triangulate::cluster_items(items.as_slice(), embedder_ref, &tri_config).await;
        run_log.record("cluster", "clustered", serde_json::json!({"clusters": clusters.len()}));

        mark_triangulated(items, &clusters);

        clusters = eatc_triangulate::filter_contradictory_clusters(
            items.as_slice(),
            clusters,
            &tri_config,
            &system.gates.trusted_domains_extra,
            request.strict,
        );
        eatc_triangulate::annotate_disputed_items(items.as_mut_slice(), &clusters, &tri_config);
        run_log.record(
            "contradiction",
            "contradiction filter applied",
            serde_json::json!({"needs_review": clusters.iter().filter(|c| c.needs_review).count()}),
        );

        eatc_triangulate::promote_primary_sources(items.as_mut_slice());

        let plan = depth_plan(request.depth);
        if plan.max_primary_fill_passes > 0 {
            self.run_primary_fill(items, &mut clusters, decision, system, &plan, http, credentials, deadline, run_log).await;
        }

        eatc_triangulate::promote_primary_sources(items.as_mut_slice());
        mark_triangulated(items, &clusters);

        let now = Utc::now();
        for item in items.iter_mut() {
            item.confidence = Some(eatc_triangulate::recompute_confidence(item, item.triangulated, now));
        }

        let snapshot = counters.snapshot();
        let attempts: u64 = snapshot.values().map(|c| c.attempts as u64).sum();
        let errors: u64 = snapshot.values().map(|c| c.errors as u64).sum();
        let metrics = eatc_metrics::compute_metrics(items.as_slice(), &clusters, errors, attempts, now);
        let report = eatc_metrics::evaluate_gates(&metrics, decision.primary_intent);
        run_log.record("gates", "gates evaluated", serde_json::json!({"passed": report.passed}));

        GateOutcome { clusters, report }
    }

    /// Issue targeted site-scoped searches for clusters lacking a
    /// primary-source domain, merge in whatever survives extraction, and
    /// widen the matching cluster's domain set so the next metrics pass
    /// sees the backfilled corroboration.
    #[allow(clippy::too_many_arguments)]
    async fn run_primary_fill(
        &self,
        items: &mut Vec<EvidenceItem>,
        clusters: &mut Vec<Cluster>,
        decision: &RouteDecision,
        system: &SystemConfig,
        plan: &DepthPlan,
        http: &Arc<HttpClient>,
        credentials: &Arc<Credentials>,
        deadline: Deadline,
        run_log: &RunLog,
    ) {
        let search_provider =
            decision.providers.iter().copied().find(|p| eatc_router::tiers::PAID_PROVIDERS.contains(p)).unwrap_or("wikipedia");

        let search = AdapterPrimarySearch {
            adapters: self.adapters.clone(),
            search_provider,
            http: Arc::clone(http),
            credentials: Arc::clone(credentials),
            deadline,
        };
        let extract = HttpPrimaryExtract {
            http: Arc::clone(http),
            credentials: Arc::clone(credentials),
            max_pdf_pages: system.http.pdf.max_pages as usize,
            deadline,
        };

        let mut remaining_passes = plan.max_primary_fill_passes;
        while remaining_passes > 0 && !deadline.is_expired() {
            let added = eatc_triangulate::primary_fill_for_clusters(clusters.as_slice(), &search, &extract).await;
            if added.is_empty() {
                break;
            }
            let base = items.len();
            *items = eatc_triangulate::dedup_merge(std::mem::take(items), added);
            attach_new_items_to_clusters(items, clusters, base);
            remaining_passes -= 1;
        }
        run_log.record("primary_fill", "primary-fill complete", serde_json::json!({"items": items.len()}));
    }

    fn write_outputs(
        &self,
        items: &[EvidenceItem],
        clusters: &[Cluster],
        report: &GateReport,
        run_ctx: &RunContext,
        output_dir: &str,
    ) -> Result<(), EatcError> {
        let dir = std::path::Path::new(output_dir);
        std::fs::create_dir_all(dir).map_err(|e| EatcError::OutputWrite(e.to_string()))?;
        crate::output::write_evidence_cards(items, dir)?;
        crate::output::write_clusters(clusters, dir)?;
        crate::output::write_metrics(report, dir)?;

        let stats: BTreeMap<String, serde_json::Value> = run_ctx
            .counters
            .snapshot()
            .into_iter()
            .map(|(provider, counters)| (provider, serde_json::json!({"attempts": counters.attempts, "errors": counters.errors})))
            .collect();
        crate::output::write_provider_stats(&stats, dir)?;
        Ok(())
    }
}

/// Set every item's `triangulated` flag from the cluster it belongs to.
/// Re-run after primary-fill widens a cluster's domain set, since that
/// can flip a cluster from singleton to triangulated.
fn mark_triangulated(items: &mut [EvidenceItem], clusters: &[Cluster]) {
    for cluster in clusters {
        let triangulated = cluster.is_triangulated();
        for &idx in &cluster.item_indices {
            if let Some(item) = items.get_mut(idx) {
                item.triangulated = triangulated;
            }
        }
    }
}

/// After merging newly primary-filled items (appended starting at index
/// `base`), attach each to the cluster whose `representative_claim`
/// matches its `family_key` metadata tag and widen that cluster's domain
/// set, so the next gate evaluation sees the backfilled corroboration.
fn attach_new_items_to_clusters(items: &[EvidenceItem], clusters: &mut [Cluster], base: usize) {
    for idx in base..items.len() {
        let Some(family_key) = items[idx].metadata.get("family_key").and_then(|v| v.as_str()) else { continue };
        if let Some(cluster) = clusters.iter_mut().find(|c| c.representative_claim.starts_with(family_key)) {
            cluster.item_indices.push(idx);
            cluster.domains.insert(items[idx].source_domain.clone());
        }
    }
}
