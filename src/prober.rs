//! Connectivity Prober (§4.F) — validates a provider's base URL and API key
//! in ≤ 10s via a three-stage probe: list-models, then a fallback preset
//! ping, then failure.
//!
//! Grounded on the teacher's `OpenAIClient::health_check` (GET `/models`)
//! generalized with the distilled spec's preset-fallback state machine,
//! which has no teacher counterpart and is newly authored against the
//! teacher's `reqwest` + status-code-mapping conventions.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Serialize;

use crate::adapter::{adapter_for, AdapterChatMessage, ChatCallParams, EmbeddingCallParams, RerankCallParams};
use crate::models::provider::Provider;
use crate::presets::get_preset;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTestType {
    Chat,
    Embedding,
    Rerank,
}

impl ProbeTestType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "chat" => Some(Self::Chat),
            "embedding" => Some(Self::Embedding),
            "rerank" => Some(Self::Rerank),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
    pub latency_ms: u64,
}

impl ProbeResult {
    fn ok(message: impl Into<String>, latency_ms: u64) -> Self {
        Self { success: true, message: message.into(), latency_ms }
    }

    fn err(message: impl Into<String>, latency_ms: u64) -> Self {
        Self { success: false, message: message.into(), latency_ms }
    }
}

pub struct ConnectivityProber {
    client: Client,
}

impl ConnectivityProber {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(PROBE_TIMEOUT)
                .build()
                .expect("static reqwest client configuration"),
        }
    }

    /// Runs the full probe for `provider`. If the caller supplied an
    /// explicit `test_model_id` + `test_type`, step 1 (list-models) is
    /// skipped entirely and that probe is issued directly (§4.F).
    pub async fn probe(
        &self,
        provider: &Provider,
        api_key: &str,
        explicit_model: Option<(&str, ProbeTestType)>,
    ) -> ProbeResult {
        let Some(base_url) = provider.base_url.as_deref() else {
            return ProbeResult::err("provider has no base_url configured", 0);
        };

        if let Some((model_id, test_type)) = explicit_model {
            return self.run_typed_probe(provider, api_key, model_id, test_type).await;
        }

        let list_models_result = self.list_models(base_url, api_key).await;
        match list_models_result {
            ListModelsOutcome::Success(latency_ms) => {
                return ProbeResult::ok("reachable", latency_ms);
            }
            ListModelsOutcome::NotFound => {
                // Step 2: PresetProbe.
            }
            ListModelsOutcome::Unauthorized(latency_ms) => {
                return ProbeResult::err("API Key 无效或权限不足", latency_ms);
            }
            ListModelsOutcome::HttpError(status, latency_ms) => {
                return ProbeResult::err(format!("upstream returned HTTP {status}"), latency_ms);
            }
            ListModelsOutcome::Timeout => {
                return ProbeResult::err("连接超时", PROBE_TIMEOUT.as_millis() as u64);
            }
            ListModelsOutcome::ConnectFailure => {
                return ProbeResult::err("无法连接到 Provider", 0);
            }
        }

        let Some(preset_id) = provider.preset_id() else {
            return ProbeResult::ok("reachable (list-models unsupported)", 0);
        };
        let Some(preset) = get_preset(preset_id) else {
            return ProbeResult::ok("reachable (list-models unsupported)", 0);
        };

        self.run_typed_probe(provider, api_key, preset.test_model_id, ProbeTestType::Chat)
            .await
    }

    async fn run_typed_probe(
        &self,
        provider: &Provider,
        api_key: &str,
        model_id: &str,
        test_type: ProbeTestType,
    ) -> ProbeResult {
        let adapter = adapter_for(&provider.provider_type);
        let start = Instant::now();

        let outcome = match test_type {
            ProbeTestType::Chat => {
                let messages = [AdapterChatMessage { role: "user".to_string(), content: "ping".to_string() }];
                adapter
                    .chat(
                        provider,
                        api_key,
                        ChatCallParams {
                            model_id,
                            messages: &messages,
                            max_tokens: Some(1),
                            temperature: None,
                            top_p: None,
                        },
                    )
                    .await
                    .map(|_| ())
            }
            ProbeTestType::Embedding => {
                let input = vec!["ping".to_string()];
                adapter
                    .embedding(
                        provider,
                        api_key,
                        EmbeddingCallParams { model_id, input_texts: &input, dimensions: None },
                    )
                    .await
                    .map(|_| ())
            }
            ProbeTestType::Rerank => {
                let documents = vec!["test".to_string()];
                adapter
                    .rerank(
                        provider,
                        api_key,
                        RerankCallParams { model_id, query: "test", documents: &documents },
                    )
                    .await
                    .map(|_| ())
            }
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => ProbeResult::ok("reachable", latency_ms),
            Err(err) => ProbeResult::err(err.to_string(), latency_ms),
        }
    }

    async fn list_models(&self, base_url: &str, api_key: &str) -> ListModelsOutcome {
        let start = Instant::now();
        let response = self
            .client
            .get(format!("{base_url}/models"))
            .bearer_auth(api_key)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                ListModelsOutcome::Success(start.elapsed().as_millis() as u64)
            }
            Ok(resp) if resp.status().as_u16() == 404 => ListModelsOutcome::NotFound,
            Ok(resp) if resp.status().as_u16() == 401 || resp.status().as_u16() == 403 => {
                ListModelsOutcome::Unauthorized(start.elapsed().as_millis() as u64)
            }
            Ok(resp) => {
                ListModelsOutcome::HttpError(resp.status().as_u16(), start.elapsed().as_millis() as u64)
            }
            Err(e) if e.is_timeout() => ListModelsOutcome::Timeout,
            Err(_) => ListModelsOutcome::ConnectFailure,
        }
    }
}

impl Default for ConnectivityProber {
    fn default() -> Self {
        Self::new()
    }
}

enum ListModelsOutcome {
    Success(u64),
    NotFound,
    Unauthorized(u64),
    HttpError(u16, u64),
    Timeout,
    ConnectFailure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_test_types() {
        assert_eq!(ProbeTestType::parse("chat"), Some(ProbeTestType::Chat));
        assert_eq!(ProbeTestType::parse("embedding"), Some(ProbeTestType::Embedding));
        assert_eq!(ProbeTestType::parse("rerank"), Some(ProbeTestType::Rerank));
        assert_eq!(ProbeTestType::parse("bogus"), None);
    }

    #[test]
    fn missing_base_url_fails_fast() {
        let provider = Provider {
            id: uuid::Uuid::nil(),
            name: "p".into(),
            slug: "p".into(),
            provider_type: "openai".into(),
            base_url: None,
            api_key_encrypted: String::new(),
            is_enabled: true,
            config: serde_json::json!({}),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let result = tokio_test::block_on(async {
            ConnectivityProber::new().probe(&provider, "key", None).await
        });
        assert!(!result.success);
    }
}
