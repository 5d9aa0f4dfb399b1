//! HTTP handlers for the gateway's REST surface (§6.1).
//!
//! Grounded on the teacher's `api::handlers` module: `State<T>` extractors,
//! `Result<Json<T>, ErrorResponse>` return shape, `health_check`. Request
//! bodies go through [`crate::api::extract::ValidatedJson`] rather than a
//! bare `axum::Json<T>` so a malformed body surfaces as the same error
//! envelope every other failure path produces. Retargeted at this system's
//! provider/slot/invoke contracts instead of the teacher's
//! OpenAI-models-list shape.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use uuid::Uuid;

use crate::adapter::{adapter_for, ChatCallParams, ChatStream, EmbeddingCallParams, RerankCallParams, StreamEvent};
use crate::api::extract::ValidatedJson;
use crate::api::state::AppState;
use crate::api::types::*;
use crate::error::{GatewayError, GatewayResult};
use crate::models::slot::SlotType;
use crate::presets::BUILTIN_PRESETS;

fn ok<T: serde::Serialize>(data: T) -> Json<DataEnvelope<T>> {
    Json(DataEnvelope::new(data))
}

fn parse_slot_type(raw: &str) -> GatewayResult<SlotType> {
    SlotType::parse(raw).ok_or_else(|| GatewayError::ValidationError(format!("unknown slot_type '{raw}'")))
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "service": "llm-gateway" }))
}

pub async fn not_found() -> GatewayError {
    GatewayError::NotFound("route", "unknown".to_string())
}

// --- Presets (public) --------------------------------------------------

pub async fn list_presets() -> Json<DataEnvelope<Vec<Value>>> {
    let presets: Vec<Value> = BUILTIN_PRESETS
        .iter()
        .map(|p| {
            serde_json::json!({
                "preset_id": p.preset_id,
                "display_name": p.display_name,
                "provider_type": p.provider_type,
                "base_url": p.base_url,
            })
        })
        .collect();
    ok(presets)
}

// --- Provider Registry ---------------------------------------------------

pub async fn create_provider(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<crate::models::provider::CreateProviderRequest>,
) -> GatewayResult<impl IntoResponse> {
    let provider = state.providers.create(req).await?;
    Ok((StatusCode::CREATED, ok(provider)))
}

pub async fn list_providers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> GatewayResult<impl IntoResponse> {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20);
    let (providers, total) = state.providers.list(page, page_size).await?;
    Ok(ok(PagedProviders { providers, total, page, page_size }))
}

pub async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> GatewayResult<impl IntoResponse> {
    let provider = state.providers.get(id).await?;
    Ok(ok(provider))
}

pub async fn update_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<crate::models::provider::UpdateProviderRequest>,
) -> GatewayResult<impl IntoResponse> {
    let provider = state.providers.update(id, req).await?;
    Ok(ok(provider))
}

pub async fn delete_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> GatewayResult<impl IntoResponse> {
    state.providers.delete(id, &state.slots).await?;
    Ok(StatusCode::OK)
}

pub async fn list_provider_models(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> GatewayResult<impl IntoResponse> {
    let models = state.providers.list_models(id).await?;
    Ok(ok(models))
}

pub async fn test_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<TestProviderRequest>,
) -> GatewayResult<impl IntoResponse> {
    let provider = state.providers.get(id).await?;
    let api_key = state.providers.decrypt_key(&provider).await?;
    let explicit = req.explicit();
    let result = state.prober.probe(&provider, &api_key, explicit).await;
    Ok(ok(result))
}

// --- Slot Registry --------------------------------------------------------

pub async fn list_slots(State(state): State<Arc<AppState>>) -> GatewayResult<impl IntoResponse> {
    let slots = state.slots.list_all().await?;
    Ok(ok(slots))
}

pub async fn get_slot(
    State(state): State<Arc<AppState>>,
    Path(raw_slot_type): Path<String>,
) -> GatewayResult<impl IntoResponse> {
    let slot_type = parse_slot_type(&raw_slot_type)?;
    let slot = state
        .slots
        .get(slot_type)
        .await?
        .unwrap_or_else(|| crate::models::ModelSlot::placeholder(slot_type));
    Ok(ok(slot))
}

pub async fn configure_slot(
    State(state): State<Arc<AppState>>,
    Path(raw_slot_type): Path<String>,
    ValidatedJson(body): ValidatedJson<ConfigureSlotBody>,
) -> GatewayResult<impl IntoResponse> {
    let slot_type = parse_slot_type(&raw_slot_type)?;
    let slot = state
        .slots
        .configure(slot_type, &state.providers, body.into())
        .await?;
    Ok(ok(slot))
}

// --- Slot invoke ----------------------------------------------------------

pub async fn invoke_chat_slot(
    State(state): State<Arc<AppState>>,
    Path(raw_slot_type): Path<String>,
    ValidatedJson(req): ValidatedJson<ChatInvokeRequest>,
) -> GatewayResult<Response> {
    let slot_type = parse_slot_type(&raw_slot_type)?;
    invoke_chat(&state, slot_type, req).await
}

pub async fn invoke_embedding_slot(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<EmbeddingInvokeRequest>,
) -> GatewayResult<Response> {
    invoke_embedding(&state, SlotType::Embedding, req).await
}

pub async fn invoke_rerank_slot(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RerankInvokeRequest>,
) -> GatewayResult<Response> {
    invoke_rerank(&state, SlotType::Rerank, req).await
}

async fn invoke_chat(state: &AppState, slot_type: SlotType, req: ChatInvokeRequest) -> GatewayResult<Response> {
    if req.stream {
        let (stream, _decision) = state
            .router
            .invoke_chat_stream(slot_type, &req.messages, req.max_tokens, req.temperature, req.top_p)
            .await?;
        return Ok(sse_response(stream));
    }

    let (result, decision) = state
        .router
        .invoke_chat(slot_type, &req.messages, req.max_tokens, req.temperature, req.top_p)
        .await?;
    Ok(ok(InvokeResponse { result, routing: decision.into() }).into_response())
}

async fn invoke_embedding(state: &AppState, slot_type: SlotType, req: EmbeddingInvokeRequest) -> GatewayResult<Response> {
    let (result, decision) = state
        .router
        .invoke_embedding(slot_type, &req.input, req.dimensions)
        .await?;
    Ok(ok(InvokeResponse { result, routing: decision.into() }).into_response())
}

async fn invoke_rerank(state: &AppState, slot_type: SlotType, req: RerankInvokeRequest) -> GatewayResult<Response> {
    let (result, decision) = state
        .router
        .invoke_rerank(slot_type, &req.query, &req.documents, req.top_n)
        .await?;
    Ok(ok(InvokeResponse { result, routing: decision.into() }).into_response())
}

// --- Direct (non-slot) calls ----------------------------------------------
//
// Bypass the Router entirely — the caller names the `(provider, model)`
// target directly, so there is no fallback chain to walk. Upstream errors
// propagate verbatim as 502 rather than being folded into a failover trace
// (§7 propagation policy).

pub async fn direct_chat(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<DirectChatRequest>,
) -> GatewayResult<Response> {
    let provider = state.providers.get(req.target.provider_id).await?;
    let api_key = state.providers.decrypt_key(&provider).await?;
    let adapter = adapter_for(&provider.provider_type);

    if req.chat.stream {
        let stream = adapter
            .chat_stream(
                &provider,
                &api_key,
                ChatCallParams {
                    model_id: &req.target.model_id,
                    messages: &req.chat.messages,
                    max_tokens: req.chat.max_tokens,
                    temperature: req.chat.temperature,
                    top_p: req.chat.top_p,
                },
            )
            .await?;
        return Ok(sse_response(stream));
    }

    let result = adapter
        .chat(
            &provider,
            &api_key,
            ChatCallParams {
                model_id: &req.target.model_id,
                messages: &req.chat.messages,
                max_tokens: req.chat.max_tokens,
                temperature: req.chat.temperature,
                top_p: req.chat.top_p,
            },
        )
        .await?;
    Ok(ok(result).into_response())
}

pub async fn direct_embedding(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<DirectEmbeddingRequest>,
) -> GatewayResult<impl IntoResponse> {
    let provider = state.providers.get(req.target.provider_id).await?;
    let api_key = state.providers.decrypt_key(&provider).await?;
    let adapter = adapter_for(&provider.provider_type);
    let result = adapter
        .embedding(
            &provider,
            &api_key,
            EmbeddingCallParams {
                model_id: &req.target.model_id,
                input_texts: &req.embedding.input,
                dimensions: req.embedding.dimensions,
            },
        )
        .await?;
    Ok(ok(result))
}

pub async fn direct_rerank(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<DirectRerankRequest>,
) -> GatewayResult<impl IntoResponse> {
    let provider = state.providers.get(req.target.provider_id).await?;
    let api_key = state.providers.decrypt_key(&provider).await?;
    let adapter = adapter_for(&provider.provider_type);
    let mut result = adapter
        .rerank(
            &provider,
            &api_key,
            RerankCallParams {
                model_id: &req.target.model_id,
                query: &req.rerank.query,
                documents: &req.rerank.documents,
            },
        )
        .await?;
    if let Some(top_n) = req.rerank.top_n {
        result.results.truncate(top_n);
    }
    Ok(ok(result))
}

/// Turns an adapter [`ChatStream`] into an SSE HTTP response: content events
/// as they arrive, the adapter's terminal summary event, then the `[DONE]`
/// sentinel (§4.D streaming parse rules, §6.2 wire format).
fn sse_response(stream: ChatStream) -> Response {
    let body_stream = stream.map(|event| match event {
        Ok(StreamEvent::Content { delta, finish_reason }) => {
            let payload = serde_json::json!({ "delta": delta, "finish_reason": finish_reason });
            Ok::<Bytes, std::convert::Infallible>(Bytes::from(format!("data: {payload}\n\n")))
        }
        Ok(StreamEvent::Summary { usage, latency_ms, model }) => {
            let payload = serde_json::json!({ "usage": usage, "latency_ms": latency_ms, "model": model });
            Ok(Bytes::from(format!("data: {payload}\n\ndata: [DONE]\n\n")))
        }
        Err(err) => {
            let payload = serde_json::json!({ "error": { "code": err.code(), "message": err.to_string() } });
            Ok(Bytes::from(format!("data: {payload}\n\ndata: [DONE]\n\n")))
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .body(Body::wrap_stream(body_stream))
        .expect("static headers are always valid")
        .into_response()
}
