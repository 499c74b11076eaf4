use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Stable per-request identity used to attribute rate-limit counters.
///
/// Derived from the client IP address. Equality is exact string match; the
/// only normalization applied is whitespace trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the client identity from proxy headers, falling back to the
    /// peer socket address.
    pub fn from_request(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        // Try to get the real IP from headers first
        if let Some(forwarded) = headers.get("x-forwarded-for") {
            if let Ok(forwarded_str) = forwarded.to_str() {
                if let Some(first_ip) = forwarded_str.split(',').next() {
                    let first_ip = first_ip.trim();
                    if !first_ip.is_empty() {
                        return Self::new(first_ip);
                    }
                }
            }
        }

        if let Some(real_ip) = headers.get("x-real-ip") {
            if let Ok(ip_str) = real_ip.to_str() {
                return Self::new(ip_str);
            }
        }

        match peer {
            Some(addr) => Self::new(addr.ip().to_string()),
            None => Self::new("unknown"),
        }
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
