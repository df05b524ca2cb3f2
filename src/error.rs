use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

/// Error taxonomy for the HTTP surface. Handlers return this instead of
/// shaping status codes inline; `IntoResponse` is the single place the
/// JSON error envelope is produced.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// Upstream catalog / store failure already rewrapped to a domain message.
    #[error("{0}")]
    Upstream(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Rewraps a catalog/store failure whose message is already the
    /// domain-level wording.
    pub fn upstream(e: anyhow::Error) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

fn is_production() -> bool {
    std::env::var("APP_ENV").map(|v| v == "production").unwrap_or(false)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, stack) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, None),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, None),
            ApiError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "unhandled internal error");
                let stack = if is_production() {
                    None
                } else {
                    Some(format!("{:?}", e))
                };
                (StatusCode::INTERNAL_SERVER_ERROR, stack)
            }
        };
        let message = match &self {
            ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        (status, axum::Json(ErrorBody { message, stack })).into_response()
    }
}

/// JSON body extractor whose rejection is the crate's error envelope, so a
/// malformed or incomplete body comes back as a 400 JSON response instead
/// of axum's plain-text 422.
pub struct Json<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let resp = ApiError::Validation("title parameter is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let resp = ApiError::Unauthorized("invalid email/password combination".into())
            .into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_maps_to_500() {
        let resp = ApiError::Upstream("failed to fetch manga data".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_hides_detail_behind_generic_message() {
        let resp = ApiError::Internal(anyhow::anyhow!("pg connection refused")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[derive(serde::Deserialize)]
    struct SamplePayload {
        #[allow(dead_code)]
        email: String,
    }

    fn json_request(body: &'static str) -> axum::http::Request<axum::body::Body> {
        axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn body_missing_field_maps_to_validation_envelope() {
        let err = Json::<SamplePayload>::from_request(json_request("{}"), &())
            .await
            .err()
            .expect("incomplete body should be rejected");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].as_str().unwrap().contains("email"));
    }

    #[tokio::test]
    async fn malformed_body_maps_to_validation_envelope() {
        let err = Json::<SamplePayload>::from_request(json_request("not json"), &())
            .await
            .err()
            .expect("malformed body should be rejected");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
