use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::request::RequestDescriptor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub max_request_bytes: usize,
    pub max_request_mb: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `POST /api/analyzeImage`: hand the raw request to the gateway pipeline.
pub async fn analyze_image(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let descriptor =
        RequestDescriptor::from_parts(parts.method.clone(), parts.uri.path(), &parts.headers, peer);

    // Enforce the size cap while reading, independent of the declared
    // Content-Length the validator already checked.
    let bytes = match axum::body::to_bytes(body, state.max_request_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return GatewayError::PayloadTooLarge {
                max_mb: state.max_request_mb,
            }
            .into_response()
        }
    };

    state.gateway.handle_analyze(&descriptor, &bytes).await
}

/// `GET /hello/{string}`: deployment smoke-test echo.
pub async fn hello(Path(string): Path<String>) -> String {
    format!("CI CD WORKS Hello + {}", string)
}

/// `GET /health`
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
