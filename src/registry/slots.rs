//! Slot Registry (§4.C) — CRUD over the four capability slots.
//!
//! Grounded on `core/slot_service.py` in the original source.

use sqlx::PgPool;

use crate::error::{GatewayError, GatewayResult};
use crate::models::slot::{ConfigureSlotRequest, ModelSlot, ModelSlotRow, SlotType};
use crate::registry::providers::ProviderRegistry;

#[derive(Clone)]
pub struct SlotRegistry {
    pool: PgPool,
}

impl SlotRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns exactly one entry per [`SlotType`] variant, in declaration
    /// order, synthesising a disabled placeholder for any slot with no
    /// stored row (§4.C).
    pub async fn list_all(&self) -> GatewayResult<Vec<ModelSlot>> {
        let mut out = Vec::with_capacity(SlotType::ALL.len());
        for slot_type in SlotType::ALL {
            out.push(match self.get(slot_type).await? {
                Some(slot) => slot,
                None => ModelSlot::placeholder(slot_type),
            });
        }
        Ok(out)
    }

    pub async fn get(&self, slot_type: SlotType) -> GatewayResult<Option<ModelSlot>> {
        let row = sqlx::query_as::<_, ModelSlotRow>(
            "SELECT * FROM llm.model_slots WHERE slot_type = $1",
        )
        .bind(slot_type)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_model().map_err(|e| GatewayError::Internal(e.to_string())))
            .transpose()
    }

    /// Upserts keyed on `slot_type`. Validates every referenced provider id
    /// exists and is enabled *at configuration time* (§4.C, §8 invariants).
    pub async fn configure(
        &self,
        slot_type: SlotType,
        providers: &ProviderRegistry,
        req: ConfigureSlotRequest,
    ) -> GatewayResult<ModelSlot> {
        let primary = providers.get(req.primary_provider_id).await?;
        if !primary.is_enabled {
            return Err(GatewayError::ProviderUnreachable(format!(
                "provider '{}' is disabled",
                primary.name
            )));
        }

        for entry in &req.fallback_chain {
            let fb = providers.get(entry.provider_id).await?;
            if !fb.is_enabled {
                return Err(GatewayError::ProviderUnreachable(format!(
                    "fallback provider '{}' is disabled",
                    fb.name
                )));
            }
        }

        let fallback_chain_json = serde_json::to_value(&req.fallback_chain)
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        let config = req.config.unwrap_or_else(|| serde_json::json!({}));

        let row = sqlx::query_as::<_, ModelSlotRow>(
            r#"
            INSERT INTO llm.model_slots
                (slot_type, primary_provider_id, primary_model_id, fallback_chain, is_enabled, config)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (slot_type) DO UPDATE SET
                primary_provider_id = EXCLUDED.primary_provider_id,
                primary_model_id = EXCLUDED.primary_model_id,
                fallback_chain = EXCLUDED.fallback_chain,
                is_enabled = EXCLUDED.is_enabled,
                config = EXCLUDED.config,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(slot_type)
        .bind(req.primary_provider_id)
        .bind(&req.primary_model_id)
        .bind(&fallback_chain_json)
        .bind(req.is_enabled)
        .bind(&config)
        .fetch_one(&self.pool)
        .await?;

        row.into_model().map_err(|e| GatewayError::Internal(e.to_string()))
    }

    /// Used by the Provider Registry's delete guard (§4.B).
    pub(crate) async fn find_referencing(&self, provider_id: uuid::Uuid) -> GatewayResult<Vec<SlotType>> {
        let rows = sqlx::query_as::<_, ModelSlotRow>("SELECT * FROM llm.model_slots")
            .fetch_all(&self.pool)
            .await?;

        let mut matched = Vec::new();
        for row in rows {
            let model = row.into_model().map_err(|e| GatewayError::Internal(e.to_string()))?;
            let references = model.primary_provider_id == provider_id
                || model.fallback_chain.iter().any(|e| e.provider_id == provider_id);
            if references {
                matched.push(model.slot_type);
            }
        }
        Ok(matched)
    }
}
