use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Boundary error type for HTTP handlers. Anything below this layer returns
/// its own typed error (`OrderBookError`, `ChainClientError`, ...); this
/// wraps whichever one occurred with the status code its kind deserves.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(status = %self.status, message = %self.message, "request failed");
        (self.status, Json(json!({ "status_code": 0, "error": self.message }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::internal(err)
    }
}

impl From<exchange_core::OrderBookError> for ApiError {
    fn from(err: exchange_core::OrderBookError) -> Self {
        ApiError::not_found(err.to_string())
    }
}

impl From<chain_client::ChainClientError> for ApiError {
    fn from(err: chain_client::ChainClientError) -> Self {
        ApiError::internal(err)
    }
}
