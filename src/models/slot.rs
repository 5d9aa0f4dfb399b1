//! Slot record — a named capability binding over a closed enum of slot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "llm.slot_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    Fast,
    Reasoning,
    Embedding,
    Rerank,
}

impl SlotType {
    /// Declaration order — `list_all` and `list_slots` are returned in this order.
    pub const ALL: [SlotType; 4] = [
        SlotType::Fast,
        SlotType::Reasoning,
        SlotType::Embedding,
        SlotType::Rerank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotType::Fast => "fast",
            SlotType::Reasoning => "reasoning",
            SlotType::Embedding => "embedding",
            SlotType::Rerank => "rerank",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "fast" => Some(SlotType::Fast),
            "reasoning" => Some(SlotType::Reasoning),
            "embedding" => Some(SlotType::Embedding),
            "rerank" => Some(SlotType::Rerank),
            _ => None,
        }
    }
}

/// One entry of a slot's fallback chain: an alternate `(provider_id, model_id)`
/// pair tried in order on primary failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub provider_id: Uuid,
    pub model_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSlot {
    pub id: Uuid,
    pub slot_type: SlotType,
    pub primary_provider_id: Uuid,
    pub primary_model_id: String,
    pub fallback_chain: Vec<FallbackEntry>,
    pub is_enabled: bool,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A disabled, empty stand-in returned by `list_all` for a slot type that has
/// no stored row yet (§4.C).
impl ModelSlot {
    pub fn placeholder(slot_type: SlotType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            slot_type,
            primary_provider_id: Uuid::nil(),
            primary_model_id: String::new(),
            fallback_chain: Vec::new(),
            is_enabled: false,
            config: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigureSlotRequest {
    pub primary_provider_id: Uuid,
    pub primary_model_id: String,
    #[serde(default)]
    pub fallback_chain: Vec<FallbackEntry>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    pub config: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

/// Row shape as stored: `fallback_chain` and `config` are persisted as JSONB
/// and parsed eagerly into typed structures at read time (§9 redesign flag),
/// rather than scattering `.get(...)` lookups through the call sites.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ModelSlotRow {
    pub id: Uuid,
    pub slot_type: SlotType,
    pub primary_provider_id: Uuid,
    pub primary_model_id: String,
    pub fallback_chain: serde_json::Value,
    pub is_enabled: bool,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModelSlotRow {
    pub(crate) fn into_model(self) -> Result<ModelSlot, serde_json::Error> {
        let fallback_chain: Vec<FallbackEntry> = serde_json::from_value(self.fallback_chain)?;
        Ok(ModelSlot {
            id: self.id,
            slot_type: self.slot_type,
            primary_provider_id: self.primary_provider_id,
            primary_model_id: self.primary_model_id,
            fallback_chain,
            is_enabled: self.is_enabled,
            config: self.config,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
