use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::ids::RunId;

/// Research depth, controlling how aggressively primary-fill backfills
/// primary sources and how many degraded-recovery retries gate
/// evaluation is willing to spend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    Rapid,
    Standard,
    Deep,
}

/// The sole input to a core run, handed in by the surrounding agent
/// choreography.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRequest {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_hint: Option<String>,
    pub depth: Depth,
    pub budget_seconds: u64,
    pub strict: bool,
    pub output_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<String>>,
}

/// A single provider's accumulated attempt/error counts. Plain atomics
/// so concurrent fan-out tasks can record against the same provider
/// without a lock.
#[derive(Debug, Default)]
pub struct ProviderCounterCell {
    pub attempts: AtomicU32,
    pub errors: AtomicU32,
}

/// A snapshot copy of one provider's counters, safe to serialize.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ProviderCounters {
    pub attempts: u32,
    pub errors: u32,
}

/// Concurrency-safe registry of per-provider counters, shared (via `Arc`)
/// across every fan-out task in a run.
#[derive(Clone, Debug, Default)]
pub struct ProviderStatsRegistry {
    cells: Arc<DashMap<String, ProviderCounterCell>>,
}

impl ProviderStatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self, provider: &str) {
        self.cells
            .entry(provider.to_string())
            .or_default()
            .attempts
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, provider: &str) {
        self.cells
            .entry(provider.to_string())
            .or_default()
            .errors
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot of every provider's counters, for
    /// `provider_error_rate` and the run log artifact.
    pub fn snapshot(&self) -> HashMap<String, ProviderCounters> {
        self.cells
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    ProviderCounters {
                        attempts: entry.value().attempts.load(Ordering::Relaxed),
                        errors: entry.value().errors.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }
}

/// Per-invocation state threaded through every component.
///
/// Single-writer for `strict_failed_once` (only the engine orchestration
/// task mutates it, between pipeline stages); `counters` is concurrency-safe
/// and written directly by fan-out tasks.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub run_id: RunId,
    pub topic: String,
    pub intent: Option<String>,
    pub depth: Depth,
    pub budget_seconds: u64,
    pub strict: bool,
    /// Set once a strict-mode gate evaluation has already triggered one
    /// degraded-recovery retry — prevents looping forever.
    pub strict_failed_once: bool,
    pub output_dir: String,
    pub counters: ProviderStatsRegistry,
    pub started_at: Instant,
}

impl RunContext {
    pub fn new(request: &RunRequest) -> Self {
        Self {
            run_id: RunId::new(),
            topic: request.topic.clone(),
            intent: request.intent_hint.clone(),
            depth: request.depth,
            budget_seconds: request.budget_seconds,
            strict: request.strict,
            strict_failed_once: false,
            output_dir: request.output_dir.clone(),
            counters: ProviderStatsRegistry::new(),
            started_at: Instant::now(),
        }
    }

    pub fn record_attempt(&self, provider: &str) {
        self.counters.record_attempt(provider);
    }

    pub fn record_error(&self, provider: &str) {
        self.counters.record_error(provider);
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    pub fn remaining_seconds(&self) -> f64 {
        (self.budget_seconds as f64 - self.elapsed_seconds()).max(0.0)
    }

    pub fn budget_exhausted(&self) -> bool {
        self.remaining_seconds() <= 0.0
    }
}
