use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::rate_limit::Tier;

/// Configuration loading failures. These abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {1:?} for environment variable {0}")]
    Invalid(&'static str, String),
}

/// Every failure a pipeline stage can produce.
///
/// The `Display` impl is the public, client-safe message. Internal detail
/// lives in separate fields and is logged, never serialized.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Content-Type must be application/json")]
    BadContentType,

    #[error("Request too large. Maximum size is {max_mb}MB.")]
    PayloadTooLarge { max_mb: u64 },

    #[error("Image URL is required")]
    MissingImageUrl,

    #[error("Invalid image URL format")]
    InvalidImageUrl,

    #[error("Not allowed by CORS")]
    OriginDenied,

    #[error("{message}")]
    RateLimited {
        tier: Tier,
        message: &'static str,
        retry_after: u64,
    },

    #[error("An error occurred while processing the image. Please try again.")]
    Upstream { detail: String },

    #[error("Internal server error")]
    Internal { detail: String },
}

impl GatewayError {
    /// Map a failure to its wire representation: an HTTP status and a JSON
    /// body carrying only the public message (plus `retryAfter` for
    /// rate-limit rejections).
    pub fn normalize(&self) -> (StatusCode, Value) {
        let status = match self {
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BadContentType
            | GatewayError::MissingImageUrl
            | GatewayError::InvalidImageUrl => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::OriginDenied => StatusCode::FORBIDDEN,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Upstream { .. } | GatewayError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match self {
            GatewayError::RateLimited { retry_after, .. } => json!({
                "error": self.to_string(),
                "retryAfter": retry_after,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, body)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Internal detail is logged here and goes no further.
        match &self {
            GatewayError::Upstream { detail } => {
                tracing::error!(target: "vision_gate::error", detail = %detail, "upstream analysis failed");
            }
            GatewayError::Internal { detail } => {
                tracing::error!(target: "vision_gate::error", detail = %detail, "unexpected failure");
            }
            GatewayError::RateLimited { tier, retry_after, .. } => {
                tracing::warn!(target: "vision_gate::error", tier = ?tier, retry_after, "rate limit exceeded");
            }
            other => {
                tracing::warn!(target: "vision_gate::error", rejection = %other, "request rejected");
            }
        }

        let (status, body) = self.normalize();
        (status, Json(body)).into_response()
    }
}
