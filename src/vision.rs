//! The upstream image-analysis collaborator.
//!
//! The gateway only ever talks to the upstream through the [`ImageAnalyzer`]
//! trait, so tests can substitute a mock and the protection pipeline stays
//! independent of the Azure wire details.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::config::Config;
use crate::error::GatewayError;

/// Feature set requested for every analysis call.
pub const ANALYSIS_FEATURES: [&str; 7] = [
    "Caption",
    "DenseCaptions",
    "Objects",
    "People",
    "Read",
    "SmartCrops",
    "Tags",
];

/// Smart-crop aspect ratios requested for every analysis call.
pub const SMART_CROP_ASPECT_RATIOS: &str = "0.9,1.33";

const API_VERSION: &str = "2023-10-01";

/// Failures from the upstream analysis service. The detail here is logged by
/// the error normalizer and never reaches the client.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Api { status: u16, body: String },
}

impl From<UpstreamError> for GatewayError {
    fn from(err: UpstreamError) -> Self {
        GatewayError::Upstream {
            detail: err.to_string(),
        }
    }
}

/// The external collaborator the gateway protects access to.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Analyze the image at `url`. `gender_neutral` is the already-coerced
    /// `"true"` / `"false"` flag. On success the raw upstream response body
    /// is returned for verbatim pass-through.
    async fn analyze(&self, url: &str, gender_neutral: &str) -> Result<Vec<u8>, UpstreamError>;
}

/// `reqwest`-backed client for the Azure AI Vision image analysis REST API.
pub struct AzureVisionClient {
    http: reqwest::Client,
    endpoint: String,
    key: String,
}

impl AzureVisionClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        // The request timeout bounds how long a slow upstream can hold
        // gateway resources.
        let http = reqwest::Client::builder()
            .timeout(config.vision_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: config.vision_endpoint.trim_end_matches('/').to_string(),
            key: config.vision_key.clone(),
        })
    }
}

#[async_trait]
impl ImageAnalyzer for AzureVisionClient {
    async fn analyze(&self, url: &str, gender_neutral: &str) -> Result<Vec<u8>, UpstreamError> {
        let request_url = format!("{}/computervision/imageanalysis:analyze", self.endpoint);
        let features = ANALYSIS_FEATURES.join(",");

        let response = self
            .http
            .post(&request_url)
            .query(&[
                ("api-version", API_VERSION),
                ("features", features.as_str()),
                ("language", "en"),
                ("gender-neutral-caption", gender_neutral),
                ("smartCrops-aspect-ratios", SMART_CROP_ASPECT_RATIOS),
            ])
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(&json!({ "url": url }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
