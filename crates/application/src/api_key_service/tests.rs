use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use ratewall_core::{AppError, AppResult};
use ratewall_domain::{ApiKey, ApiKeyValue, RateLimitPolicy, SlidingWindow};

use super::ApiKeyService;
use crate::rate_limit_ports::{ApiKeyRepository, SubjectStateRepository};

#[derive(Default)]
struct TestKeyRepository {
    policies: Mutex<HashMap<String, RateLimitPolicy>>,
}

impl TestKeyRepository {
    fn stored(&self) -> HashMap<String, RateLimitPolicy> {
        self.policies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SubjectStateRepository for TestKeyRepository {
    async fn fetch_window(&self, _subject: &str) -> AppResult<Option<SlidingWindow>> {
        Ok(None)
    }

    async fn persist_window(&self, _subject: &str, _window: &SlidingWindow) -> AppResult<()> {
        Ok(())
    }

    async fn fetch_block_marker(&self, _subject: &str) -> AppResult<bool> {
        Ok(false)
    }

    async fn arm_block_marker(&self, _subject: &str, _duration_seconds: i64) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ApiKeyRepository for TestKeyRepository {
    async fn fetch_policy(&self, key: &ApiKeyValue) -> AppResult<Option<RateLimitPolicy>> {
        Ok(self.stored().get(key.as_str()).copied())
    }

    async fn persist_policy(&self, key: &ApiKey) -> AppResult<()> {
        let mut policies = self.policies.lock().unwrap_or_else(PoisonError::into_inner);
        if policies.contains_key(key.value().as_str()) {
            return Err(AppError::Conflict("api key already exists".to_owned()));
        }
        policies.insert(key.value().as_str().to_owned(), key.policy());
        Ok(())
    }
}

#[tokio::test]
async fn created_key_is_hex_and_persisted_with_its_policy() {
    let repository = Arc::new(TestKeyRepository::default());
    let service = ApiKeyService::new(repository.clone());
    let policy = RateLimitPolicy::new(10, 60, 300);

    let api_key = service
        .create_api_key(policy)
        .await
        .unwrap_or_else(|error| panic!("key creation failed: {error}"));

    let value = api_key.value().as_str();
    assert_eq!(value.len(), 64);
    assert!(value.chars().all(|character| character.is_ascii_hexdigit()));
    assert_eq!(repository.stored().get(value), Some(&policy));
}

#[tokio::test]
async fn created_keys_are_unique() {
    let repository = Arc::new(TestKeyRepository::default());
    let service = ApiKeyService::new(repository.clone());
    let policy = RateLimitPolicy::new(1, 1, 1);

    let first = service.create_api_key(policy).await;
    let second = service.create_api_key(policy).await;

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(repository.stored().len(), 2);
}

#[tokio::test]
async fn invalid_policy_is_a_validation_error_and_stores_nothing() {
    let repository = Arc::new(TestKeyRepository::default());
    let service = ApiKeyService::new(repository.clone());

    for policy in [
        RateLimitPolicy::new(0, 60, 300),
        RateLimitPolicy::new(10, 0, 300),
        RateLimitPolicy::new(10, 60, 0),
        RateLimitPolicy::new(10, 1_000_000_000_000_000, 300),
        RateLimitPolicy::new(10, 60, 1_000_000_000_000_000),
    ] {
        let result = service.create_api_key(policy).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    assert!(repository.stored().is_empty());
}
