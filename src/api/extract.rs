//! `ValidatedJson<T>` — a `Json<T>` extractor whose rejection is a
//! [`GatewayError`] instead of axum's own plain-text rejection body.
//!
//! axum 0.6's built-in `Json<T>` extractor bypasses the gateway's error
//! envelope entirely on a malformed or wrong-shape request body: its
//! `JsonRejection` implements `IntoResponse` directly, producing a bare
//! text/plain body rather than the `{error:{code,message,details},meta}`
//! shape every other error path in this service produces (§7). Every
//! handler that previously took `axum::Json<T>` takes this instead so a
//! schema violation always surfaces as `VALIDATION_ERROR` (422).

use async_trait::async_trait;
use axum::extract::{FromRequest, Json};
use axum::http::Request;
use axum::BoxError;

use crate::error::GatewayError;

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, B, T> FromRequest<S, B> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned,
    B: axum::body::HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => Err(GatewayError::ValidationError(rejection.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    #[tokio::test]
    async fn malformed_body_becomes_validation_error() {
        let req = HttpRequest::builder()
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let result = ValidatedJson::<Payload>::from_request(req, &()).await;
        assert!(matches!(result, Err(GatewayError::ValidationError(_))));
    }

    #[tokio::test]
    async fn well_formed_body_extracts() {
        let req = HttpRequest::builder()
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"acme"}"#))
            .unwrap();
        let result = ValidatedJson::<Payload>::from_request(req, &()).await;
        assert!(result.is_ok());
    }
}
