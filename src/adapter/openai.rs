//! The `openai` wire dialect — covers OpenAI-native endpoints and every
//! built-in preset (§4.D, §9 redesign flag: dialects are a closed enum keyed
//! off `provider_type`, not a runtime SDK lookup).
//!
//! Grounded on the teacher's `llm::providers::openai::client::OpenAIClient`:
//! same `reqwest::Client` + header-building + status-code error mapping
//! shape, retargeted at this system's four call modes and failure taxonomy.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;

use crate::adapter::sse::SseLineParser;
use crate::adapter::{
    AdapterChatMessage, ChatCallParams, ChatCallResult, ChatStream, EmbeddingCallParams,
    EmbeddingCallResult, EmbeddingItem, RerankCallParams, RerankCallResult, RerankResultItem,
    StreamEvent, Usage, UpstreamAdapter,
};
use crate::error::{GatewayError, GatewayResult};
use crate::models::provider::Provider;

const NON_STREAMING_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiAdapter {
    client: Client,
}

impl OpenAiAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn base_url(provider: &Provider) -> GatewayResult<&str> {
        provider.base_url.as_deref().ok_or_else(|| {
            GatewayError::UpstreamError(format!("provider '{}' has no base_url", provider.slug))
        })
    }

    /// Maps a terminal upstream outcome (connect failure, timeout, HTTP≥400,
    /// unparseable body) onto `UPSTREAM_ERROR` per §4.D's failure table.
    async fn check_status(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let truncated: String = body.chars().take(1000).collect();
        Err(GatewayError::UpstreamErrorWithDetails {
            message: format!("upstream returned HTTP {status}"),
            details: serde_json::json!({ "upstream_status": status, "upstream_body": truncated }),
        })
    }

    fn network_error(err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::UpstreamError("connect timeout".to_string())
        } else if err.is_connect() {
            GatewayError::UpstreamError(format!("connection refused: {err}"))
        } else {
            GatewayError::UpstreamError(err.to_string())
        }
    }
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamAdapter for OpenAiAdapter {
    async fn chat(
        &self,
        provider: &Provider,
        api_key: &str,
        params: ChatCallParams<'_>,
    ) -> GatewayResult<ChatCallResult> {
        let base_url = Self::base_url(provider)?;
        let body = serde_json::json!({
            "model": params.model_id,
            "messages": params.messages.iter().map(|m| serde_json::json!({
                "role": m.role,
                "content": m.content,
            })).collect::<Vec<_>>(),
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "stream": false,
        });

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{base_url}/chat/completions"))
            .bearer_auth(api_key)
            .json(&body)
            .timeout(NON_STREAMING_TIMEOUT)
            .send()
            .await
            .map_err(Self::network_error)?;

        let response = Self::check_status(response).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::UpstreamError(format!("unparseable response body: {e}")))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let usage = parse_usage(&payload["usage"]);
        let model = payload["model"]
            .as_str()
            .unwrap_or(params.model_id)
            .to_string();

        Ok(ChatCallResult {
            content,
            usage,
            latency_ms,
            model,
        })
    }

    async fn chat_stream(
        &self,
        provider: &Provider,
        api_key: &str,
        params: ChatCallParams<'_>,
    ) -> GatewayResult<ChatStream> {
        let base_url = Self::base_url(provider)?;
        let body = serde_json::json!({
            "model": params.model_id,
            "messages": params.messages.iter().map(|m| serde_json::json!({
                "role": m.role,
                "content": m.content,
            })).collect::<Vec<_>>(),
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "stream": true,
        });
        let model_id = params.model_id.to_string();

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{base_url}/chat/completions"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::network_error)?;

        let response = Self::check_status(response).await?;
        let byte_stream = response.bytes_stream();

        // State: upstream byte stream, line parser, a queue of complete SSE
        // `data:` lines not yet turned into a StreamEvent, remembered usage
        // (some upstreams only send it on the final chunk, §4.D streaming
        // parse rules), whether the terminal summary has already been
        // emitted, the latency clock, and the echoed model id.
        let state = (
            byte_stream,
            SseLineParser::new(),
            std::collections::VecDeque::<String>::new(),
            None::<Usage>,
            false,
            start,
            model_id,
        );

        let stream = futures::stream::unfold(state, move |mut state| async move {
            loop {
                let (bytes, parser, pending, remembered_usage, done, start, model_id) = &mut state;
                if *done {
                    return None;
                }

                let Some(line) = pending.pop_front() else {
                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            pending.extend(parser.push(&chunk));
                            continue;
                        }
                        Some(Err(e)) => {
                            *done = true;
                            return Some((Err(Self::network_error(e)), state));
                        }
                        None => {
                            *done = true;
                            let summary = StreamEvent::Summary {
                                usage: remembered_usage.take().unwrap_or_default(),
                                latency_ms: start.elapsed().as_millis() as u64,
                                model: model_id.clone(),
                            };
                            return Some((Ok(summary), state));
                        }
                    }
                };

                if line == "[DONE]" {
                    *done = true;
                    let summary = StreamEvent::Summary {
                        usage: remembered_usage.take().unwrap_or_default(),
                        latency_ms: start.elapsed().as_millis() as u64,
                        model: model_id.clone(),
                    };
                    return Some((Ok(summary), state));
                }

                let Ok(payload) = serde_json::from_str::<Value>(&line) else {
                    continue;
                };
                if let Some(usage_val) = payload.get("usage") {
                    if usage_val.is_object() && !usage_val.as_object().unwrap().is_empty() {
                        *remembered_usage = Some(parse_usage(usage_val));
                    }
                }
                let delta = payload["choices"][0]["delta"]["content"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                let finish_reason = payload["choices"][0]["finish_reason"]
                    .as_str()
                    .map(|s| s.to_string());
                return Some((Ok(StreamEvent::Content { delta, finish_reason }), state));
            }
        });

        Ok(Box::pin(stream))
    }

    async fn embedding(
        &self,
        provider: &Provider,
        api_key: &str,
        params: EmbeddingCallParams<'_>,
    ) -> GatewayResult<EmbeddingCallResult> {
        let base_url = Self::base_url(provider)?;
        let body = serde_json::json!({
            "model": params.model_id,
            "input": params.input_texts,
            "dimensions": params.dimensions,
        });

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{base_url}/embeddings"))
            .bearer_auth(api_key)
            .json(&body)
            .timeout(NON_STREAMING_TIMEOUT)
            .send()
            .await
            .map_err(Self::network_error)?;

        let response = Self::check_status(response).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::UpstreamError(format!("unparseable response body: {e}")))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let embeddings: Vec<EmbeddingItem> = payload["data"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|e| {
                let values: Vec<f32> = e["embedding"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect();
                EmbeddingItem {
                    index: e["index"].as_u64().unwrap_or(0) as usize,
                    dimensions: values.len(),
                    values,
                }
            })
            .collect();
        let usage = parse_usage(&payload["usage"]);
        let model = payload["model"]
            .as_str()
            .unwrap_or(params.model_id)
            .to_string();

        Ok(EmbeddingCallResult {
            embeddings,
            usage,
            latency_ms,
            model,
        })
    }

    async fn rerank(
        &self,
        provider: &Provider,
        api_key: &str,
        params: RerankCallParams<'_>,
    ) -> GatewayResult<RerankCallResult> {
        let base_url = Self::base_url(provider)?;
        let body = serde_json::json!({
            "model": params.model_id,
            "query": params.query,
            "documents": params.documents,
        });

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{base_url}/rerank"))
            .bearer_auth(api_key)
            .json(&body)
            .timeout(NON_STREAMING_TIMEOUT)
            .send()
            .await
            .map_err(Self::network_error)?;

        let response = Self::check_status(response).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::UpstreamError(format!("unparseable response body: {e}")))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let mut results: Vec<RerankResultItem> = payload["results"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|r| {
                let index = r["index"].as_u64().unwrap_or(0) as usize;
                RerankResultItem {
                    document: params
                        .documents
                        .get(index)
                        .cloned()
                        .unwrap_or_default(),
                    relevance_score: r["relevance_score"].as_f64().unwrap_or(0.0) as f32,
                    index,
                }
            })
            .collect();
        results.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap());

        let model = payload["model"]
            .as_str()
            .unwrap_or(params.model_id)
            .to_string();

        Ok(RerankCallResult {
            results,
            latency_ms,
            model,
        })
    }
}

fn parse_usage(value: &Value) -> Usage {
    Usage {
        prompt_tokens: value["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: value["completion_tokens"].as_u64().unwrap_or(0) as u32,
        total_tokens: value["total_tokens"].as_u64().unwrap_or(0) as u32,
    }
}
