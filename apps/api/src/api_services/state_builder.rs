use std::sync::Arc;

use ratewall_application::{
    AdmissionService, ApiKeyAdmissionService, ApiKeyRepository, ApiKeyService, Clock,
    IpAdmissionService, SubjectLocks, SubjectStateRepository, SystemClock,
};
use ratewall_core::{AppError, AppResult};
use ratewall_domain::RateLimitPolicy;
use ratewall_infrastructure::{
    InMemoryApiKeyRepository, InMemoryIpRepository, RedisApiKeyRepository, RedisIpRepository,
};

use crate::api_config::{ApiConfig, RateLimitStoreConfig};
use crate::state::AppState;

use super::redis::build_redis_client;

struct RepositorySet {
    ip_repository: Arc<dyn SubjectStateRepository>,
    api_key_repository: Arc<dyn ApiKeyRepository>,
}

pub fn build_app_state(config: &ApiConfig) -> AppResult<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match config.rate_limit_store {
        RateLimitStoreConfig::Redis => {
            let redis_url = config.redis_url.as_deref().ok_or_else(|| {
                AppError::Validation("REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned())
            })?;
            let redis_client = build_redis_client(redis_url)?;
            let repositories = RepositorySet {
                ip_repository: Arc::new(RedisIpRepository::new(
                    redis_client.clone(),
                    config.redis_key_prefix.as_str(),
                )),
                api_key_repository: Arc::new(RedisApiKeyRepository::new(
                    redis_client.clone(),
                    config.redis_key_prefix.as_str(),
                )),
            };

            Ok(assemble(
                repositories,
                config.ip_policy,
                SubjectLocks::new(config.subject_lock_capacity),
                clock,
                Some(redis_client),
            ))
        }
        RateLimitStoreConfig::Memory => Ok(build_in_memory_state(
            config.ip_policy,
            config.subject_lock_capacity,
            clock,
        )),
    }
}

/// Builds state over process-local repositories whose expiry follows `clock`.
///
/// `subject_lock_capacity` also bounds the repositories' tables before they
/// sweep expired entries.
pub fn build_in_memory_state(
    ip_policy: RateLimitPolicy,
    subject_lock_capacity: usize,
    clock: Arc<dyn Clock>,
) -> AppState {
    let repositories = RepositorySet {
        ip_repository: Arc::new(InMemoryIpRepository::with_sweep_threshold(
            clock.clone(),
            subject_lock_capacity,
        )),
        api_key_repository: Arc::new(InMemoryApiKeyRepository::with_sweep_threshold(
            clock.clone(),
            subject_lock_capacity,
        )),
    };

    assemble(
        repositories,
        ip_policy,
        SubjectLocks::new(subject_lock_capacity),
        clock,
        None,
    )
}

fn assemble(
    repositories: RepositorySet,
    ip_policy: RateLimitPolicy,
    locks: SubjectLocks,
    clock: Arc<dyn Clock>,
    redis_client: Option<redis::Client>,
) -> AppState {
    let admission_service = AdmissionService::new(
        IpAdmissionService::new(repositories.ip_repository, ip_policy, locks.clone()),
        ApiKeyAdmissionService::new(repositories.api_key_repository.clone(), locks),
    );

    AppState {
        admission_service,
        api_key_service: ApiKeyService::new(repositories.api_key_repository),
        clock,
        redis_client,
    }
}
