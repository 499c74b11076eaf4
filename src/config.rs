use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

/// Settings for a single rate-limit tier.
#[derive(Debug, Clone)]
pub struct TierSettings {
    /// Fixed window length.
    pub window: Duration,
    /// Maximum requests allowed per key within one window.
    pub max_requests: u32,
    /// Nominal retry-after reported to clients, in seconds.
    pub retry_after_secs: u64,
}

/// Rate-limit configuration for all three tiers.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub global: TierSettings,
    pub daily: TierSettings,
    pub per_minute: TierSettings,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            global: TierSettings {
                window: Duration::from_secs(15 * 60),
                max_requests: 100,
                retry_after_secs: 900,
            },
            daily: TierSettings {
                window: Duration::from_secs(24 * 60 * 60),
                max_requests: 100,
                retry_after_secs: 86400,
            },
            per_minute: TierSettings {
                window: Duration::from_secs(60),
                max_requests: 5,
                retry_after_secs: 60,
            },
        }
    }
}

/// Service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Upstream Azure AI Vision endpoint
    pub vision_endpoint: String,
    /// Upstream Azure AI Vision API key
    pub vision_key: String,
    /// Timeout for upstream analysis calls
    pub vision_timeout: Duration,
    /// Origins allowed to call the API (exact string match)
    pub allowed_origins: Vec<String>,
    /// Reject requests without an Origin header
    pub require_origin: bool,
    /// Maximum accepted request body size in bytes
    pub max_request_bytes: u64,
    /// Enforce `Content-Type: application/json` on POST
    pub validate_content_type: bool,
    /// Enforce the request size limit
    pub validate_request_size: bool,
    /// Enforce image URL well-formedness
    pub validate_url: bool,
    /// Default log level for the env filter
    pub log_level: String,
    /// Emit audit events for inbound requests
    pub log_requests: bool,
    /// Emit audit events for outbound responses
    pub log_responses: bool,
    pub rate_limits: RateLimitSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            vision_endpoint: String::new(),
            vision_key: String::new(),
            vision_timeout: Duration::from_secs(10),
            allowed_origins: Vec::new(),
            require_origin: true,
            max_request_bytes: 10 * 1024 * 1024,
            validate_content_type: true,
            validate_request_size: true,
            validate_url: true,
            log_level: "info".to_string(),
            log_requests: true,
            log_responses: true,
            rate_limits: RateLimitSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `VISION_ENDPOINT` and `VISION_KEY` are required; the process must not
    /// start without them.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let vision_endpoint = require_var("VISION_ENDPOINT")?;
        let vision_key = require_var("VISION_KEY")?;

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("BIND_ADDR", raw))?,
            Err(_) => defaults.bind_addr,
        };

        let mut rate_limits = defaults.rate_limits.clone();
        rate_limits.global.max_requests =
            parse_var("GLOBAL_RATE_LIMIT", rate_limits.global.max_requests)?;
        rate_limits.daily.max_requests =
            parse_var("DAILY_RATE_LIMIT", rate_limits.daily.max_requests)?;
        rate_limits.per_minute.max_requests =
            parse_var("PER_MINUTE_RATE_LIMIT", rate_limits.per_minute.max_requests)?;

        Ok(Self {
            bind_addr,
            vision_endpoint,
            vision_key,
            vision_timeout: Duration::from_secs(parse_var("VISION_TIMEOUT_SECS", 10u64)?),
            allowed_origins: parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            require_origin: parse_var("REQUIRE_ORIGIN", defaults.require_origin)?,
            max_request_bytes: parse_var("MAX_REQUEST_BYTES", defaults.max_request_bytes)?,
            validate_content_type: parse_var("VALIDATE_CONTENT_TYPE", true)?,
            validate_request_size: parse_var("VALIDATE_REQUEST_SIZE", true)?,
            validate_url: parse_var("VALIDATE_URL", true)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_requests: parse_var("LOG_REQUESTS", true)?,
            log_responses: parse_var("LOG_RESPONSES", true)?,
            rate_limits,
        })
    }

    /// Maximum request size in whole megabytes, for client-facing messages.
    pub fn max_request_mb(&self) -> u64 {
        self.max_request_bytes / (1024 * 1024)
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated origin list, trimming whitespace and dropping
/// empty entries.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
