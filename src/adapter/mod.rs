//! Upstream Adapter (§4.D) — one attempt against one `(provider, model)`.
//!
//! The wire dialect is modeled as a closed enum keyed off `provider_type`
//! rather than a dynamically-dispatched SDK lookup (§9 redesign flag). Today
//! every built-in preset and the default `provider_type` are the single
//! `openai` dialect; the trait seam is kept so a second dialect can be added
//! without touching the Router.

pub mod openai;
mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;
use crate::models::provider::Provider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatCallParams<'a> {
    pub model_id: &'a str,
    pub messages: &'a [AdapterChatMessage],
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCallResult {
    pub content: String,
    pub usage: Usage,
    pub latency_ms: u64,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingCallParams<'a> {
    pub model_id: &'a str,
    pub input_texts: &'a [String],
    pub dimensions: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingItem {
    pub index: usize,
    pub values: Vec<f32>,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingCallResult {
    pub embeddings: Vec<EmbeddingItem>,
    pub usage: Usage,
    pub latency_ms: u64,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct RerankCallParams<'a> {
    pub model_id: &'a str,
    pub query: &'a str,
    pub documents: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct RerankResultItem {
    pub index: usize,
    pub document: String,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RerankCallResult {
    pub results: Vec<RerankResultItem>,
    pub latency_ms: u64,
    pub model: String,
}

/// One streamed content event, or the terminal synthetic summary, per the
/// wire format in §4.D / §6.2. The `[DONE]` sentinel itself is not
/// represented here — the HTTP handler appends it after the stream ends.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Content {
        delta: String,
        finish_reason: Option<String>,
    },
    Summary {
        usage: Usage,
        latency_ms: u64,
        model: String,
    },
}

pub type ChatStream = BoxStream<'static, GatewayResult<StreamEvent>>;

/// One attempt against one `(provider, model)`. Implementors must not retry
/// internally — retry/fallback sequencing is the Router's job (§4.E).
#[async_trait]
pub trait UpstreamAdapter: Send + Sync {
    async fn chat(
        &self,
        provider: &Provider,
        api_key: &str,
        params: ChatCallParams<'_>,
    ) -> GatewayResult<ChatCallResult>;

    async fn chat_stream(
        &self,
        provider: &Provider,
        api_key: &str,
        params: ChatCallParams<'_>,
    ) -> GatewayResult<ChatStream>;

    async fn embedding(
        &self,
        provider: &Provider,
        api_key: &str,
        params: EmbeddingCallParams<'_>,
    ) -> GatewayResult<EmbeddingCallResult>;

    async fn rerank(
        &self,
        provider: &Provider,
        api_key: &str,
        params: RerankCallParams<'_>,
    ) -> GatewayResult<RerankCallResult>;
}

/// Picks the adapter implementation for a provider's `provider_type`. Every
/// built-in preset is `openai`, and it is also the fallback for any unknown
/// tag since the OpenAI-compatible dialect covers the large majority of
/// third-party endpoints the gateway targets.
pub fn adapter_for(_provider_type: &str) -> std::sync::Arc<dyn UpstreamAdapter> {
    std::sync::Arc::new(openai::OpenAiAdapter::new())
}
