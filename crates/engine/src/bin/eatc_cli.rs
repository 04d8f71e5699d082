//! `eatc-cli`: the driver binary around the evidence acquisition and
//! triangulation core. Runs one request end to end and exits with the
//! documented exit code; `--serve` instead starts a small axum server
//! exposing `/health` and `/metrics` for long-running deployment.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use clap::Parser;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use eatc_common::types::{Depth, RunRequest};
use eatc_engine::{EngineConfig, Pipeline, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "eatc-cli", about = "Evidence acquisition and triangulation core driver")]
struct Args {
    /// Free-text research topic.
    #[arg(long)]
    topic: Option<String>,

    /// Override automatic intent classification.
    #[arg(long)]
    intent_hint: Option<String>,

    /// Fan-out depth: rapid, standard, or deep.
    #[arg(long, default_value = "standard")]
    depth: String,

    /// Wall-clock budget for the run, in seconds.
    #[arg(long, default_value_t = 120)]
    budget_seconds: u64,

    /// Fail the run (instead of writing a degraded bundle) when gates don't pass twice.
    #[arg(long)]
    strict: bool,

    /// Directory the run's output artifacts are written into.
    #[arg(long, default_value = "./out")]
    output_dir: String,

    /// Restrict fan-out to this explicit provider list (comma-separated), bypassing routing.
    #[arg(long, value_delimiter = ',')]
    providers: Option<Vec<String>>,

    /// Path to a TOML system config file; falls back to built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start an axum server exposing /health and /metrics instead of running one request.
    #[arg(long)]
    serve: bool,

    /// Port for `--serve` mode.
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

struct AppState {
    metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();

    let metrics_handle = PrometheusBuilder::new().install_recorder().expect("failed to install Prometheus metrics recorder");

    let engine_config = match eatc_engine::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration error, refusing to start");
            std::process::exit(4);
        }
    };

    if args.serve {
        serve(engine_config, metrics_handle, args.port).await;
        return;
    }

    let Some(topic) = args.topic else {
        tracing::error!("--topic is required unless --serve is set");
        std::process::exit(4);
    };

    let depth = match args.depth.to_lowercase().as_str() {
        "rapid" => Depth::Rapid,
        "standard" => Depth::Standard,
        "deep" => Depth::Deep,
        other => {
            tracing::error!(depth = other, "unrecognized --depth value, expected rapid|standard|deep");
            std::process::exit(4);
        }
    };

    let request = RunRequest {
        topic,
        intent_hint: args.intent_hint,
        depth,
        budget_seconds: args.budget_seconds,
        strict: args.strict,
        output_dir: args.output_dir,
        providers: args.providers,
    };

    let pipeline = Pipeline::new(engine_config);
    match pipeline.run(&request).await {
        Ok(RunOutcome::Passed { report }) => {
            tracing::info!(passed = true, "run complete");
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            std::process::exit(0);
        }
        Ok(RunOutcome::Degraded { report }) => {
            tracing::warn!(passed = false, "run degraded: gates did not pass");
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            std::process::exit(2);
        }
        Ok(RunOutcome::NoEvidence) => {
            tracing::error!("run produced zero evidence items");
            std::process::exit(3);
        }
        Err(e) if e.is_config_error() => {
            tracing::error!(error = %e, "configuration error");
            std::process::exit(4);
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            std::process::exit(4);
        }
    }
}

/// Long-running mode: holds a `Pipeline` ready to serve `/health` and
/// `/metrics`. Request-driven invocation is left to the external planner
/// and collector agents this core plugs into; this mode exists for
/// deployments that want a stable process to scrape.
async fn serve(engine_config: EngineConfig, metrics_handle: PrometheusHandle, port: u16) {
    let _pipeline = Arc::new(Pipeline::new(engine_config));
    let state = Arc::new(AppState { metrics_handle });

    let app = Router::new().route("/health", get(health_handler)).route("/metrics", get(metrics_handler)).with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await.expect("failed to bind TCP listener");
    tracing::info!(port, "eatc-cli listening");
    axum::serve(listener, app).await.expect("HTTP server error");
}

async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({"status": "healthy"}))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
