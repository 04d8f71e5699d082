//! Optional OpenAI-backed embedding client for the paraphrase clusterer's
//! cosine-similarity path: a dynamic import fallback turned into a
//! compile-time capability flag. Mirrors the request/response shapes of
//! a full embeddings backfill/cache service, narrowed down to the
//! `Embedder` capability `eatc-triangulate::cluster` expects. Only compiled behind the
//! `embeddings` feature; absent, the clusterer falls back to token-Jaccard.

use async_trait::async_trait;
use eatc_common::config::EmbeddingConfig;
use serde::{Deserialize, Serialize};

use eatc_triangulate::Embedder;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: u32,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

pub struct OpenAiEmbedder {
    http: reqwest::Client,
    api_key: String,
    config: EmbeddingConfig,
}

impl OpenAiEmbedder {
    /// Construct an embedder from `OPENAI_API_KEY`, if set. Returns `None`
    /// when the key is absent, matching the capability-flag pattern: the
    /// caller simply never builds one and the cluster step falls back to
    /// Jaccard.
    pub fn from_env(config: EmbeddingConfig) -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())?;
        Some(Self { http: reqwest::Client::new(), api_key, config })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Option<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Some(Vec::new());
        }

        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1) as usize) {
            let request = EmbeddingRequest { model: &self.config.model, input: chunk, dimensions: self.config.dimensions };
            let response = self.http.post(OPENAI_EMBEDDINGS_URL).bearer_auth(&self.api_key).json(&request).send().await.ok()?;
            if !response.status().is_success() {
                tracing::warn!(status = %response.status(), "embeddings call failed, falling back to Jaccard for this batch");
                return None;
            }
            let body: EmbeddingResponse = response.json().await.ok()?;
            let mut sorted = body.data;
            sorted.sort_by_key(|d| d.index);
            all.extend(sorted.into_iter().map(|d| d.embedding));
        }
        Some(all)
    }
}
