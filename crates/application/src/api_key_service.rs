//! Issuing API keys with their own rate limit policy.
//!
//! Credentials are 32 bytes of operating-system randomness, hex encoded.

use std::sync::Arc;

use ratewall_core::{AppError, AppResult};
use ratewall_domain::{API_KEY_BYTES, ApiKey, ApiKeyValue, RateLimitPolicy};
use tracing::info;

use crate::rate_limit_ports::ApiKeyRepository;

#[cfg(test)]
mod tests;

/// Application service for the administrative create-key flow.
#[derive(Clone)]
pub struct ApiKeyService {
    repository: Arc<dyn ApiKeyRepository>,
}

impl ApiKeyService {
    /// Creates a new API key service.
    #[must_use]
    pub fn new(repository: Arc<dyn ApiKeyRepository>) -> Self {
        Self { repository }
    }

    /// Generates a credential for `policy`, stores it and returns the key.
    ///
    /// An invalid policy is a caller error and nothing is stored.
    pub async fn create_api_key(&self, policy: RateLimitPolicy) -> AppResult<ApiKey> {
        let api_key = ApiKey::new(generate_api_key_value()?, policy).map_err(|error| match error {
            AppError::InvalidPolicy(message) => AppError::Validation(message),
            other => other,
        })?;

        self.repository.persist_policy(&api_key).await?;
        info!(
            api_key = %api_key.value().redacted(),
            max_requests = policy.max_requests,
            time_window_seconds = policy.time_window_seconds,
            block_duration_seconds = policy.block_duration_seconds,
            "api key created"
        );

        Ok(api_key)
    }
}

fn generate_api_key_value() -> AppResult<ApiKeyValue> {
    let mut bytes = [0u8; API_KEY_BYTES];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate api key: {error}")))?;

    Ok(ApiKeyValue::from_random_bytes(&bytes))
}
