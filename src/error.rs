//! Unified error currency for the gateway core.
//!
//! Every component below the HTTP boundary returns `Result<T, GatewayError>`.
//! The HTTP layer turns a `GatewayError` into the `{error: {code, message,
//! details}, meta}` envelope via `IntoResponse`.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::Value;

use crate::api::types::{ApiMeta, ErrorBody, ErrorEnvelope};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("slug '{0}' is already in use")]
    ProviderSlugConflict(String),

    #[error("provider is referenced by slots: {0:?}")]
    ProviderInUse(Vec<String>),

    #[error("{0}")]
    ProviderUnreachable(String),

    #[error("unknown preset '{0}'")]
    InvalidPreset(String),

    #[error("slot '{0}' is not configured or disabled")]
    SlotNotConfigured(String),

    #[error("all models failed")]
    AllModelsFailed { trace: Value },

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("upstream error: {message}")]
    UpstreamErrorWithDetails { message: String, details: Value },

    #[error("encryption error")]
    EncryptionError,

    #[error("{0} '{1}' not found")]
    NotFound(&'static str, String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProviderSlugConflict(_) => "PROVIDER_SLUG_CONFLICT",
            Self::ProviderInUse(_) => "PROVIDER_IN_USE",
            Self::ProviderUnreachable(_) => "PROVIDER_UNREACHABLE",
            Self::InvalidPreset(_) => "INVALID_PRESET",
            Self::SlotNotConfigured(_) => "SLOT_NOT_CONFIGURED",
            Self::AllModelsFailed { .. } => "ALL_MODELS_FAILED",
            Self::UpstreamError(_) | Self::UpstreamErrorWithDetails { .. } => "UPSTREAM_ERROR",
            Self::EncryptionError => "ENCRYPTION_ERROR",
            Self::NotFound(_, _) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::ProviderSlugConflict(_) | Self::ProviderInUse(_) => StatusCode::CONFLICT,
            Self::ProviderUnreachable(_) | Self::InvalidPreset(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::SlotNotConfigured(_) | Self::AllModelsFailed { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::UpstreamError(_) | Self::UpstreamErrorWithDetails { .. } => StatusCode::BAD_GATEWAY,
            Self::EncryptionError | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_, _) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::ProviderInUse(slots) => Some(serde_json::json!({ "referenced_slots": slots })),
            Self::AllModelsFailed { trace } => Some(serde_json::json!({ "failover_trace": trace })),
            Self::UpstreamErrorWithDetails { details, .. } => Some(details.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
            meta: ApiMeta::new(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("resource", "unknown".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
