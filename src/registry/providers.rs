//! Provider Registry (§4.B) — CRUD over Provider records.
//!
//! Grounded on `core/provider_service.py` in the original source, translated
//! from SQLAlchemy ORM calls into `sqlx` queries against schema `llm`.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::models::provider::{CreateProviderRequest, Provider, UpdateProviderRequest};
use crate::presets::get_preset;
use crate::vault;

#[derive(Clone)]
pub struct ProviderRegistry {
    pool: PgPool,
    encryption_key: [u8; 32],
}

/// `[a-z0-9][a-z0-9_-]*` (§4.B data model), matching the original source's
/// `ProviderCreate.slug` / `ProviderUpdate.slug` pydantic pattern.
fn validate_slug_format(slug: &str) -> GatewayResult<()> {
    let mut chars = slug.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(GatewayError::ValidationError(format!(
            "slug '{slug}' must match [a-z0-9][a-z0-9_-]*"
        )))
    }
}

impl ProviderRegistry {
    pub fn new(pool: PgPool, encryption_key: [u8; 32]) -> Self {
        Self { pool, encryption_key }
    }

    pub async fn create(&self, req: CreateProviderRequest) -> GatewayResult<Provider> {
        let (provider_type, base_url, config) = if let Some(preset_id) = &req.preset_id {
            let preset = get_preset(preset_id)
                .ok_or_else(|| GatewayError::InvalidPreset(preset_id.clone()))?;
            let base_url = req.base_url.unwrap_or_else(|| preset.base_url.to_string());
            let provider_type = req
                .provider_type
                .unwrap_or_else(|| preset.provider_type.to_string());
            let mut config = req.config;
            config["preset_id"] = serde_json::Value::String(preset_id.clone());
            (provider_type, Some(base_url), config)
        } else {
            let base_url = req.base_url.ok_or_else(|| {
                GatewayError::ProviderUnreachable("base_url is required without a preset".into())
            })?;
            let provider_type = req.provider_type.ok_or_else(|| {
                GatewayError::ProviderUnreachable("provider_type is required without a preset".into())
            })?;
            (provider_type, Some(base_url), req.config)
        };

        validate_slug_format(&req.slug)?;
        if self.slug_exists(&req.slug, None).await? {
            return Err(GatewayError::ProviderSlugConflict(req.slug));
        }

        let ciphertext = vault::encrypt(&req.api_key, &self.encryption_key)?;

        let provider = sqlx::query_as::<_, Provider>(
            r#"
            INSERT INTO llm.providers (name, slug, provider_type, base_url, api_key_encrypted, config)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.slug)
        .bind(&provider_type)
        .bind(&base_url)
        .bind(&ciphertext)
        .bind(&config)
        .fetch_one(&self.pool)
        .await?;

        Ok(provider)
    }

    pub async fn get(&self, id: Uuid) -> GatewayResult<Provider> {
        sqlx::query_as::<_, Provider>("SELECT * FROM llm.providers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(GatewayError::NotFound("Provider", id.to_string()))
    }

    pub async fn list(&self, page: i64, page_size: i64) -> GatewayResult<(Vec<Provider>, i64)> {
        let offset = (page.max(1) - 1) * page_size;
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM llm.providers")
            .fetch_one(&self.pool)
            .await?;
        let providers = sqlx::query_as::<_, Provider>(
            "SELECT * FROM llm.providers ORDER BY created_at DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;
        Ok((providers, total))
    }

    pub async fn update(&self, id: Uuid, updates: UpdateProviderRequest) -> GatewayResult<Provider> {
        let mut provider = self.get(id).await?;

        if let Some(new_slug) = &updates.slug {
            validate_slug_format(new_slug)?;
            if new_slug != &provider.slug && self.slug_exists(new_slug, Some(id)).await? {
                return Err(GatewayError::ProviderSlugConflict(new_slug.clone()));
            }
            provider.slug = new_slug.clone();
        }
        if let Some(name) = updates.name {
            provider.name = name;
        }
        if let Some(provider_type) = updates.provider_type {
            provider.provider_type = provider_type;
        }
        if let Some(base_url) = updates.base_url {
            provider.base_url = Some(base_url);
        }
        if let Some(is_enabled) = updates.is_enabled {
            provider.is_enabled = is_enabled;
        }
        if let Some(config) = updates.config {
            provider.config = config;
        }
        if let Some(api_key) = updates.api_key {
            provider.api_key_encrypted = vault::encrypt(&api_key, &self.encryption_key)?;
        }

        let updated = sqlx::query_as::<_, Provider>(
            r#"
            UPDATE llm.providers
            SET name = $1, slug = $2, provider_type = $3, base_url = $4,
                api_key_encrypted = $5, is_enabled = $6, config = $7, updated_at = now()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&provider.name)
        .bind(&provider.slug)
        .bind(&provider.provider_type)
        .bind(&provider.base_url)
        .bind(&provider.api_key_encrypted)
        .bind(provider.is_enabled)
        .bind(&provider.config)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Refuses with `PROVIDER_IN_USE` if any slot references this provider,
    /// in its primary slot or anywhere in its fallback chain. The final hard
    /// delete additionally relies on the `ON DELETE RESTRICT` foreign key as
    /// the storage-layer backstop against a race under concurrent slot edits
    /// (§5 locking discipline).
    pub async fn delete(&self, id: Uuid, slots: &crate::registry::slots::SlotRegistry) -> GatewayResult<()> {
        self.get(id).await?;

        let referencing = slots.find_referencing(id).await?;
        if !referencing.is_empty() {
            return Err(GatewayError::ProviderInUse(
                referencing.iter().map(|s| s.as_str().to_string()).collect(),
            ));
        }

        sqlx::query("DELETE FROM llm.providers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns the decrypted API key for one call's duration. Callers must
    /// not log, cache, or return the value.
    pub async fn decrypt_key(&self, provider: &Provider) -> GatewayResult<String> {
        vault::decrypt(&provider.api_key_encrypted, &self.encryption_key)
    }

    /// Best-effort passthrough to the provider's `GET /models`. Any network
    /// or HTTP≥400 outcome is swallowed into an empty list — this endpoint
    /// is advisory UI sugar, never a propagated error (§4.B).
    pub async fn list_models(&self, id: Uuid) -> GatewayResult<Vec<serde_json::Value>> {
        let provider = self.get(id).await?;
        let api_key = match self.decrypt_key(&provider).await {
            Ok(k) => k,
            Err(_) => return Ok(Vec::new()),
        };
        let Some(base_url) = &provider.base_url else {
            return Ok(Vec::new());
        };

        let client = reqwest::Client::new();
        let response = client
            .get(format!("{base_url}/models"))
            .bearer_auth(&api_key)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await;

        let Ok(response) = response else {
            return Ok(Vec::new());
        };
        if !response.status().is_success() {
            return Ok(Vec::new());
        }
        let Ok(body) = response.json::<serde_json::Value>().await else {
            return Ok(Vec::new());
        };

        let mut models: Vec<serde_json::Value> = body
            .get("data")
            .and_then(|d| d.as_array())
            .into_iter()
            .flatten()
            .filter_map(|m| {
                let id = m.get("id")?.as_str()?;
                Some(serde_json::json!({
                    "id": id,
                    "owned_by": m.get("owned_by").and_then(|v| v.as_str()).unwrap_or(""),
                }))
            })
            .collect();
        models.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        Ok(models)
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> GatewayResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM llm.providers WHERE slug = $1 AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_slugs() {
        assert!(validate_slug_format("openrouter").is_ok());
        assert!(validate_slug_format("kimi-2").is_ok());
        assert!(validate_slug_format("a_b-c9").is_ok());
    }

    #[test]
    fn rejects_uppercase_leading_digit_edge_cases() {
        assert!(validate_slug_format("Kimi").is_err());
        assert!(validate_slug_format("-kimi").is_err());
        assert!(validate_slug_format("_kimi").is_err());
        assert!(validate_slug_format("").is_err());
        assert!(validate_slug_format("kimi zhipu").is_err());
    }
}
