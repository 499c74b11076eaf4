use axum::http::Method;

use crate::config::Config;
use crate::error::GatewayError;
use crate::request::RequestDescriptor;

/// Cheap request-shape checks that run before any expensive work.
///
/// Rules apply in order and the first failure wins:
/// 1. method must be GET, POST, or OPTIONS;
/// 2. POST bodies must declare `application/json`;
/// 3. the declared body size must not exceed the configured maximum.
///
/// Rules 2 and 3 are individually toggleable through configuration.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    validate_content_type: bool,
    validate_request_size: bool,
    max_request_bytes: u64,
    max_request_mb: u64,
}

impl RequestValidator {
    pub fn new(config: &Config) -> Self {
        Self {
            validate_content_type: config.validate_content_type,
            validate_request_size: config.validate_request_size,
            max_request_bytes: config.max_request_bytes,
            max_request_mb: config.max_request_mb(),
        }
    }

    pub fn validate(&self, descriptor: &RequestDescriptor) -> Result<(), GatewayError> {
        if !matches!(
            descriptor.method,
            Method::GET | Method::POST | Method::OPTIONS
        ) {
            return Err(GatewayError::MethodNotAllowed);
        }

        if self.validate_content_type && descriptor.method == Method::POST {
            let is_json = descriptor
                .content_type
                .as_deref()
                .map(|ct| ct.contains("application/json"))
                .unwrap_or(false);
            if !is_json {
                return Err(GatewayError::BadContentType);
            }
        }

        if self.validate_request_size {
            if let Some(length) = descriptor.content_length {
                if length > self.max_request_bytes {
                    return Err(GatewayError::PayloadTooLarge {
                        max_mb: self.max_request_mb,
                    });
                }
            }
        }

        Ok(())
    }
}
