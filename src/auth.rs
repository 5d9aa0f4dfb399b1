//! Auth middleware (§6.1, SPEC_FULL ambient layer K).
//!
//! Two parallel verification paths feed into one `Principal`: a bearer JWT
//! checked against the process `JWT_SECRET` (HS256), generalizing the
//! teacher's `SecurityManager`/`TokenClaims` in `src/llm/security.rs`, and an
//! `X-API-Key` header resolved through an injected async callback mirroring
//! the original source's `prism_shared.auth.api_key_verifier` contract.
//! User/API-key issuance itself is out of scope (§1) — this module only
//! verifies credentials handed to it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use futures::future::BoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    fn from_claim(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// The authenticated caller, attached to request extensions by [`authenticate`].
#[derive(Debug, Clone)]
pub struct Principal {
    pub subject: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    sub: String,
    #[serde(default)]
    role: String,
}

/// Callback resolving a plaintext `X-API-Key` value to a [`Principal`],
/// supplied at boot. The gateway never mints or stores API keys itself.
pub type ApiKeyVerifier =
    Arc<dyn Fn(String) -> BoxFuture<'static, Option<Principal>> + Send + Sync>;

/// A verifier backed by a static in-memory map — suitable for tests and
/// local development. Production deployments supply their own callback
/// wired to the external auth service.
pub fn in_memory_verifier(keys: HashMap<String, Principal>) -> ApiKeyVerifier {
    Arc::new(move |key: String| {
        let found = keys.get(&key).cloned();
        Box::pin(async move { found })
    })
}

pub struct AuthConfig {
    pub jwt_secret: String,
    pub api_key_verifier: ApiKeyVerifier,
}

async fn resolve_principal(config: &AuthConfig, headers: &HeaderMap) -> Option<Principal> {
    if let Some(token) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
    {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let decoded = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &validation,
        );
        if let Ok(data) = decoded {
            return Some(Principal {
                subject: data.claims.sub,
                role: Role::from_claim(&data.claims.role),
            });
        }
        return None;
    }

    if let Some(key) = headers.get("x-api-key").and_then(|h| h.to_str().ok()) {
        return (config.api_key_verifier)(key.to_string()).await;
    }

    None
}

/// Verifies the request's bearer JWT or `X-API-Key` and inserts the
/// resulting [`Principal`] into request extensions for downstream handlers
/// and [`require_admin`] to read.
pub async fn authenticate(
    State(config): State<Arc<AuthConfig>>,
    mut req: Request<Body>,
    next: Next<Body>,
) -> Result<Response, GatewayError> {
    let principal = resolve_principal(&config, req.headers())
        .await
        .ok_or(GatewayError::Unauthorized)?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Gates admin-only routes (§6.1 "Admin? yes"): verifies the credential and
/// additionally requires `Role::Admin`, in one middleware so the two checks
/// cannot be mis-ordered by route-layer composition.
pub async fn authenticate_admin(
    State(config): State<Arc<AuthConfig>>,
    mut req: Request<Body>,
    next: Next<Body>,
) -> Result<Response, GatewayError> {
    let principal = resolve_principal(&config, req.headers())
        .await
        .ok_or(GatewayError::Unauthorized)?;
    if principal.role != Role::Admin {
        return Err(GatewayError::Forbidden);
    }
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_verifier_resolves_known_key() {
        let mut keys = HashMap::new();
        keys.insert(
            "secret-key".to_string(),
            Principal { subject: "svc-a".to_string(), role: Role::User },
        );
        let verifier = in_memory_verifier(keys);
        let resolved = verifier("secret-key".to_string()).await;
        assert!(resolved.is_some());
        assert_eq!(resolved.unwrap().subject, "svc-a");
    }

    #[tokio::test]
    async fn in_memory_verifier_rejects_unknown_key() {
        let verifier = in_memory_verifier(HashMap::new());
        assert!(verifier("nope".to_string()).await.is_none());
    }

    #[test]
    fn role_from_claim_defaults_to_user() {
        assert_eq!(Role::from_claim("admin"), Role::Admin);
        assert_eq!(Role::from_claim("whatever"), Role::User);
    }
}
