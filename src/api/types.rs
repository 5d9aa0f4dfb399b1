//! Wire types for the HTTP surface (§6): the `{data?, error?, meta}`
//! response envelope and the request/response bodies for each route.
//!
//! Grounded on the teacher's `api::types` module shape (OpenAI-compatible
//! request/response structs), retargeted at this system's envelope and
//! provider/slot/invoke contracts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::adapter::AdapterChatMessage;
use crate::models::slot::FallbackEntry;
use crate::prober::ProbeTestType;

#[derive(Debug, Clone, Serialize)]
pub struct ApiMeta {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl ApiMeta {
    pub fn new() -> Self {
        Self { request_id: Uuid::new_v4(), timestamp: Utc::now() }
    }
}

impl Default for ApiMeta {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
    pub meta: ApiMeta,
}

/// Successful-response envelope. Every handler that returns `Ok` wraps its
/// payload in one of these rather than returning the bare struct.
#[derive(Debug, Clone, Serialize)]
pub struct DataEnvelope<T: Serialize> {
    pub data: T,
    pub meta: ApiMeta,
}

impl<T: Serialize> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data, meta: ApiMeta::new() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PagedProviders {
    pub providers: Vec<crate::models::Provider>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestProviderRequest {
    pub test_model_id: Option<String>,
    pub test_type: Option<String>,
}

impl TestProviderRequest {
    pub fn explicit(&self) -> Option<(&str, ProbeTestType)> {
        let model_id = self.test_model_id.as_deref()?;
        let test_type = ProbeTestType::parse(self.test_type.as_deref()?)?;
        Some((model_id, test_type))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigureSlotBody {
    pub primary_provider_id: Uuid,
    pub primary_model_id: String,
    #[serde(default)]
    pub fallback_chain: Vec<FallbackEntry>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    pub config: Option<Value>,
}

fn default_true() -> bool {
    true
}

impl From<ConfigureSlotBody> for crate::models::slot::ConfigureSlotRequest {
    fn from(body: ConfigureSlotBody) -> Self {
        Self {
            primary_provider_id: body.primary_provider_id,
            primary_model_id: body.primary_model_id,
            fallback_chain: body.fallback_chain,
            is_enabled: body.is_enabled,
            config: body.config,
        }
    }
}

/// Shared chat-invocation body for both the slot-invoke routes and the
/// direct (non-slot) completions route (§6.1).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatInvokeRequest {
    pub messages: Vec<AdapterChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingInvokeRequest {
    pub input: Vec<String>,
    pub dimensions: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerankInvokeRequest {
    pub query: String,
    pub documents: Vec<String>,
    /// Supplemented from original source (SPEC_FULL.md §3): truncates
    /// results to the top N by score after a successful attempt.
    pub top_n: Option<usize>,
}

/// Direct (non-slot) call target — the caller names the provider and model
/// explicitly since there is no slot to resolve (§6.1 "Direct chat
/// (non-slot)").
#[derive(Debug, Clone, Deserialize)]
pub struct DirectTarget {
    pub provider_id: Uuid,
    pub model_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectChatRequest {
    #[serde(flatten)]
    pub target: DirectTarget,
    #[serde(flatten)]
    pub chat: ChatInvokeRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectEmbeddingRequest {
    #[serde(flatten)]
    pub target: DirectTarget,
    #[serde(flatten)]
    pub embedding: EmbeddingInvokeRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectRerankRequest {
    #[serde(flatten)]
    pub target: DirectTarget,
    #[serde(flatten)]
    pub rerank: RerankInvokeRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvokeResponse<T: Serialize> {
    pub result: T,
    pub routing: RoutingWire,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutingWire {
    pub provider_name: String,
    pub model_id: String,
    pub slot_type: crate::models::slot::SlotType,
    pub used_resource_pool: bool,
    pub failover_trace: crate::models::FailoverTrace,
}

impl From<crate::models::RoutingDecision> for RoutingWire {
    fn from(d: crate::models::RoutingDecision) -> Self {
        Self {
            provider_name: d.provider_name,
            model_id: d.model_id,
            slot_type: d.slot_type,
            used_resource_pool: d.used_resource_pool,
            failover_trace: d.failover_trace,
        }
    }
}
