use std::net::SocketAddr;
use std::time::SystemTime;

use axum::http::{HeaderMap, Method};

use crate::client_key::ClientKey;

/// Per-request snapshot of everything the protection pipeline inspects.
///
/// Built once when a request arrives and owned by that request's processing;
/// never shared across requests.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    /// Declared `Content-Length`, if present and parseable.
    pub content_length: Option<u64>,
    pub origin: Option<String>,
    pub user_agent: Option<String>,
    pub client_key: ClientKey,
    pub received_at: SystemTime,
}

impl RequestDescriptor {
    pub fn from_parts(
        method: Method,
        path: &str,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> Self {
        Self {
            method,
            path: path.to_string(),
            content_type: header_str(headers, "content-type"),
            content_length: header_str(headers, "content-length").and_then(|v| v.parse().ok()),
            origin: header_str(headers, "origin"),
            user_agent: header_str(headers, "user-agent"),
            client_key: ClientKey::from_request(headers, peer),
            received_at: SystemTime::now(),
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
