use crate::error::GatewayError;

/// Validates a request's declared origin against the configured allow-list.
///
/// Matching is exact string equality (scheme + host + optional port), no
/// wildcard or subdomain matching. Rejections are generic; the configured
/// origins are never echoed back.
#[derive(Debug, Clone)]
pub struct OriginGate {
    allowed_origins: Vec<String>,
    /// When set, a missing Origin header is a rejection. There is no
    /// same-origin exemption.
    require_origin: bool,
}

impl OriginGate {
    pub fn new(allowed_origins: Vec<String>, require_origin: bool) -> Self {
        Self {
            allowed_origins,
            require_origin,
        }
    }

    pub fn validate(&self, origin: Option<&str>) -> Result<(), GatewayError> {
        match origin {
            None => {
                if self.require_origin {
                    Err(GatewayError::OriginDenied)
                } else {
                    Ok(())
                }
            }
            Some(origin) => {
                if self.allowed_origins.iter().any(|allowed| allowed == origin) {
                    Ok(())
                } else {
                    tracing::warn!(
                        target: "vision_gate::origin",
                        origin = %origin,
                        "blocked request from unauthorized origin"
                    );
                    Err(GatewayError::OriginDenied)
                }
            }
        }
    }
}
