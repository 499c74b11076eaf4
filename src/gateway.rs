//! Composition root: the ordered protection pipeline wrapped around the
//! upstream analysis collaborator.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use url::Url;

use crate::audit::AuditLogger;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::GatewayError;
use crate::origin::OriginGate;
use crate::rate_limit::RateLimiter;
use crate::request::RequestDescriptor;
use crate::validation::RequestValidator;
use crate::vision::ImageAnalyzer;

/// Owns every pipeline stage and runs them in a fixed order:
/// shape validation, origin gate, rate-limit tiers (Global, Daily,
/// PerMinute), body extraction, audit, upstream dispatch. The first failing
/// stage short-circuits the rest and is normalized into a wire response.
pub struct Gateway {
    validator: RequestValidator,
    origin_gate: OriginGate,
    limiter: RateLimiter,
    audit: AuditLogger,
    analyzer: Arc<dyn ImageAnalyzer>,
    validate_url: bool,
}

impl Gateway {
    pub fn new(config: &Config, analyzer: Arc<dyn ImageAnalyzer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            validator: RequestValidator::new(config),
            origin_gate: OriginGate::new(config.allowed_origins.clone(), config.require_origin),
            limiter: RateLimiter::new(&config.rate_limits, clock),
            audit: AuditLogger::new(config),
            analyzer,
            validate_url: config.validate_url,
        }
    }

    /// Handle one analysis request end to end. Always produces a response;
    /// failures go through the error normalizer, and the outcome is
    /// audit-logged either way.
    pub async fn handle_analyze(&self, descriptor: &RequestDescriptor, body: &[u8]) -> Response {
        let response = match self.run_pipeline(descriptor, body).await {
            Ok(upstream_body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                upstream_body,
            )
                .into_response(),
            Err(err) => err.into_response(),
        };

        self.audit.log_response(descriptor, response.status());
        response
    }

    async fn run_pipeline(
        &self,
        descriptor: &RequestDescriptor,
        body: &[u8],
    ) -> Result<Vec<u8>, GatewayError> {
        self.validator.validate(descriptor)?;
        self.origin_gate.validate(descriptor.origin.as_deref())?;
        self.limiter.check_all(&descriptor.client_key)?;

        let (url, gender_neutral) = self.parse_body(body)?;

        self.audit.log_request(descriptor);
        tracing::info!(
            target: "vision_gate::gateway",
            client = %descriptor.client_key,
            url = %url,
            "processing image analysis"
        );

        // The upstream call holds no rate-limit lock.
        let result = self.analyzer.analyze(&url, gender_neutral).await?;
        Ok(result)
    }

    /// Extract and validate the analysis parameters from the request body.
    ///
    /// `genderNeutral` coerces to `"true"` only for boolean `true` or the
    /// string `"true"`; anything else, including an absent field, is
    /// `"false"`.
    fn parse_body(&self, body: &[u8]) -> Result<(String, &'static str), GatewayError> {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

        let url = match value.get("url").and_then(Value::as_str) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return Err(GatewayError::MissingImageUrl),
        };

        if self.validate_url && Url::parse(&url).is_err() {
            return Err(GatewayError::InvalidImageUrl);
        }

        let gender_neutral = match value.get("genderNeutral") {
            Some(Value::Bool(true)) => "true",
            Some(Value::String(s)) if s == "true" => "true",
            _ => "false",
        };

        Ok((url, gender_neutral))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}
