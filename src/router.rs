//! Slot Router (§4.E) — resolves a `(slot_type, payload)` call into an
//! eventual RoutingDecision, trying the primary then the fallback chain in
//! order and stopping on first success.
//!
//! Grounded on the teacher's `LLMRouter` fallback loop in `src/llm/mod.rs`,
//! generalized from a provider-priority list to this system's
//! slot-primary-plus-chain model and four call modes.

use std::time::Instant;

use crate::adapter::{
    AdapterChatMessage, ChatCallParams, ChatStream, EmbeddingCallParams, RerankCallParams,
};
use crate::adapter::adapter_for;
use crate::error::{GatewayError, GatewayResult};
use crate::models::routing::{AttemptRecord, RoutingDecision};
use crate::models::slot::{ModelSlot, SlotType};
use crate::registry::{ProviderRegistry, SlotRegistry};

pub struct SlotRouter {
    slots: SlotRegistry,
    providers: ProviderRegistry,
}

/// One resolved `(provider_id, model_id)` target to attempt, in order:
/// the primary followed by each fallback chain entry.
struct Candidate {
    provider_id: uuid::Uuid,
    model_id: String,
}

impl SlotRouter {
    pub fn new(slots: SlotRegistry, providers: ProviderRegistry) -> Self {
        Self { slots, providers }
    }

    async fn resolve_slot(&self, slot_type: SlotType) -> GatewayResult<ModelSlot> {
        let slot = self
            .slots
            .get(slot_type)
            .await?
            .ok_or_else(|| GatewayError::SlotNotConfigured(slot_type.as_str().to_string()))?;
        if !slot.is_enabled {
            return Err(GatewayError::SlotNotConfigured(slot_type.as_str().to_string()));
        }
        Ok(slot)
    }

    fn candidates(slot: &ModelSlot) -> Vec<Candidate> {
        let mut out = vec![Candidate {
            provider_id: slot.primary_provider_id,
            model_id: slot.primary_model_id.clone(),
        }];
        out.extend(slot.fallback_chain.iter().map(|entry| Candidate {
            provider_id: entry.provider_id,
            model_id: entry.model_id.clone(),
        }));
        out
    }

    /// Drives the primary → fallback chain loop shared by every call mode.
    /// `attempt` performs one upstream call given a resolved provider +
    /// model id and returns the attempt's outcome alongside its result.
    async fn run_chain<T, F, Fut>(
        &self,
        slot_type: SlotType,
        mut attempt: F,
    ) -> GatewayResult<(T, RoutingDecision)>
    where
        F: FnMut(crate::models::Provider, String) -> Fut,
        Fut: std::future::Future<Output = GatewayResult<T>> + Send,
        T: Send,
    {
        let slot = self.resolve_slot(slot_type).await?;
        let candidates = Self::candidates(&slot);
        let mut trace = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.into_iter().enumerate() {
            let provider = match self.providers.get(candidate.provider_id).await {
                Ok(p) => p,
                Err(_) if index == 0 => {
                    // The primary provider vanished between configuration and
                    // call. This is a configuration error, not a retryable
                    // upstream failure (§4.E "what is retried vs. what is
                    // fatal") — the fallback chain is never consulted.
                    return Err(GatewayError::SlotNotConfigured(slot_type.as_str().to_string()));
                }
                Err(_) => {
                    trace.push(AttemptRecord {
                        provider_name: String::new(),
                        model_id: candidate.model_id,
                        success: false,
                        error_message: Some("provider no longer exists".to_string()),
                        latency_ms: None,
                    });
                    continue;
                }
            };

            let started = Instant::now();
            match attempt(provider.clone(), candidate.model_id.clone()).await {
                Ok(result) => {
                    trace.push(AttemptRecord {
                        provider_name: provider.name.clone(),
                        model_id: candidate.model_id.clone(),
                        success: true,
                        error_message: None,
                        latency_ms: Some(started.elapsed().as_millis() as u64),
                    });
                    let decision = RoutingDecision {
                        provider_name: provider.name,
                        model_id: candidate.model_id,
                        slot_type,
                        used_resource_pool: index > 0,
                        failover_trace: trace,
                    };
                    return Ok((result, decision));
                }
                Err(err) => {
                    trace.push(AttemptRecord {
                        provider_name: provider.name,
                        model_id: candidate.model_id,
                        success: false,
                        error_message: Some(err.to_string()),
                        latency_ms: Some(started.elapsed().as_millis() as u64),
                    });
                }
            }
        }

        Err(GatewayError::AllModelsFailed {
            trace: serde_json::to_value(&trace).unwrap_or_default(),
        })
    }

    pub async fn invoke_chat(
        &self,
        slot_type: SlotType,
        messages: &[AdapterChatMessage],
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        top_p: Option<f32>,
    ) -> GatewayResult<(crate::adapter::ChatCallResult, RoutingDecision)> {
        self.run_chain(slot_type, |provider, model_id| {
            let providers = &self.providers;
            async move {
                let api_key = providers.decrypt_key(&provider).await?;
                let adapter = adapter_for(&provider.provider_type);
                adapter
                    .chat(
                        &provider,
                        &api_key,
                        ChatCallParams {
                            model_id: &model_id,
                            messages,
                            max_tokens,
                            temperature,
                            top_p,
                        },
                    )
                    .await
            }
        })
        .await
    }

    pub async fn invoke_embedding(
        &self,
        slot_type: SlotType,
        input_texts: &[String],
        dimensions: Option<u32>,
    ) -> GatewayResult<(crate::adapter::EmbeddingCallResult, RoutingDecision)> {
        self.run_chain(slot_type, |provider, model_id| {
            let providers = &self.providers;
            async move {
                let api_key = providers.decrypt_key(&provider).await?;
                let adapter = adapter_for(&provider.provider_type);
                adapter
                    .embedding(
                        &provider,
                        &api_key,
                        EmbeddingCallParams {
                            model_id: &model_id,
                            input_texts,
                            dimensions,
                        },
                    )
                    .await
            }
        })
        .await
    }

    pub async fn invoke_rerank(
        &self,
        slot_type: SlotType,
        query: &str,
        documents: &[String],
        top_n: Option<usize>,
    ) -> GatewayResult<(crate::adapter::RerankCallResult, RoutingDecision)> {
        let (mut result, decision) = self
            .run_chain(slot_type, |provider, model_id| {
                let providers = &self.providers;
                async move {
                    let api_key = providers.decrypt_key(&provider).await?;
                    let adapter = adapter_for(&provider.provider_type);
                    adapter
                        .rerank(
                            &provider,
                            &api_key,
                            RerankCallParams {
                                model_id: &model_id,
                                query,
                                documents,
                            },
                        )
                        .await
                }
            })
            .await?;

        // Supplemented from original source (SPEC_FULL.md §3): truncate to
        // `top_n` on the same path the primary and every fallback share,
        // after the trace has already been recorded.
        if let Some(top_n) = top_n {
            result.results.truncate(top_n);
        }
        Ok((result, decision))
    }

    /// Streaming chat does not retry across the fallback chain mid-stream —
    /// once content has been sent to the client it cannot be retracted — but
    /// the primary-vs-fallback *selection* still goes through the same
    /// chain-walk so a dead primary fails over to the next candidate before
    /// any bytes reach the client.
    pub async fn invoke_chat_stream(
        &self,
        slot_type: SlotType,
        messages: &[AdapterChatMessage],
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        top_p: Option<f32>,
    ) -> GatewayResult<(ChatStream, RoutingDecision)> {
        self.run_chain(slot_type, |provider, model_id| {
            let providers = &self.providers;
            async move {
                let api_key = providers.decrypt_key(&provider).await?;
                let adapter = adapter_for(&provider.provider_type);
                adapter
                    .chat_stream(
                        &provider,
                        &api_key,
                        ChatCallParams {
                            model_id: &model_id,
                            messages,
                            max_tokens,
                            temperature,
                            top_p,
                        },
                    )
                    .await
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::provider::Provider;
    use crate::models::slot::{FallbackEntry, ModelSlot};
    use uuid::Uuid;

    fn provider(name: &str) -> Provider {
        Provider {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: name.to_string(),
            provider_type: "openai".to_string(),
            base_url: Some("https://example.test".to_string()),
            api_key_encrypted: String::new(),
            is_enabled: true,
            config: serde_json::json!({}),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    /// Exercises only the pure chain-walking logic in [`SlotRouter::candidates`]
    /// — the database- and network-backed paths are covered by the
    /// `tests/` end-to-end scenarios against a mock adapter.
    #[test]
    fn candidates_lists_primary_before_fallback_chain_in_order() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let p3 = Uuid::new_v4();
        let slot = ModelSlot {
            id: Uuid::new_v4(),
            slot_type: SlotType::Reasoning,
            primary_provider_id: p1,
            primary_model_id: "m1".to_string(),
            fallback_chain: vec![
                FallbackEntry { provider_id: p2, model_id: "m2".to_string() },
                FallbackEntry { provider_id: p3, model_id: "m3".to_string() },
            ],
            is_enabled: true,
            config: serde_json::json!({}),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let candidates = SlotRouter::candidates(&slot);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].provider_id, p1);
        assert_eq!(candidates[1].provider_id, p2);
        assert_eq!(candidates[2].provider_id, p3);
    }

    #[test]
    fn provider_helper_builds_enabled_provider() {
        let p = provider("acme");
        assert!(p.is_enabled);
    }
}
