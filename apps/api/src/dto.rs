use ratewall_domain::RateLimitPolicy;
use serde::{Deserialize, Serialize};

/// Incoming payload for issuing an API key.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CreateApiKeyRequest {
    #[serde(rename = "max_req", alias = "max_requests")]
    pub max_requests: i64,
    pub time_window: i64,
    pub block_duration: i64,
}

impl From<CreateApiKeyRequest> for RateLimitPolicy {
    fn from(value: CreateApiKeyRequest) -> Self {
        RateLimitPolicy::new(value.max_requests, value.time_window, value.block_duration)
    }
}

/// Issued credential.
#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    pub api_key: String,
}

/// Plain message body of the demo routes.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Health payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
