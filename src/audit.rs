use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::StatusCode;
use tracing::info;

use crate::config::Config;
use crate::request::RequestDescriptor;

/// Emits structured audit events for inbound requests and outbound status
/// codes. Side-effecting only: nothing here influences control flow, and a
/// subscriber dropping events never fails the pipeline.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    log_requests: bool,
    log_responses: bool,
}

impl AuditLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            log_requests: config.log_requests,
            log_responses: config.log_responses,
        }
    }

    pub fn log_request(&self, descriptor: &RequestDescriptor) {
        if !self.log_requests {
            return;
        }

        info!(
            target: "vision_gate::audit",
            received_at = epoch_secs(descriptor.received_at),
            method = %descriptor.method,
            path = %descriptor.path,
            client = %descriptor.client_key,
            origin = descriptor.origin.as_deref().unwrap_or("Unknown"),
            user_agent = descriptor.user_agent.as_deref().unwrap_or("Unknown"),
            "api request"
        );
    }

    pub fn log_response(&self, descriptor: &RequestDescriptor, status: StatusCode) {
        if !self.log_responses {
            return;
        }

        info!(
            target: "vision_gate::audit",
            method = %descriptor.method,
            path = %descriptor.path,
            client = %descriptor.client_key,
            status = status.as_u16(),
            "api response"
        );
    }
}

/// Arrival time as seconds since the Unix epoch, for the audit record.
fn epoch_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
