//! Provider record — one upstream LLM vendor endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub provider_type: String,
    pub base_url: Option<String>,
    /// Never serialized to any API response.
    #[serde(skip_serializing)]
    pub api_key_encrypted: String,
    pub is_enabled: bool,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub fn preset_id(&self) -> Option<&str> {
        self.config.get("preset_id").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProviderRequest {
    pub name: String,
    pub slug: String,
    pub provider_type: Option<String>,
    pub base_url: Option<String>,
    pub api_key: String,
    pub preset_id: Option<String>,
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateProviderRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub provider_type: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub is_enabled: Option<bool>,
    pub config: Option<serde_json::Value>,
}
