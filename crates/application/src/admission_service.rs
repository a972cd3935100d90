//! Admission use cases: one allow/deny decision per request.
//!
//! A decision checks the subject's block marker, loads its policy, extends
//! the sliding window with the current request, persists the window and
//! arms a block marker when the limit is exceeded. Decisions for the same
//! subject are serialized inside one process through [`SubjectLocks`];
//! across processes the store calls are independent, so concurrent
//! decisions may undercount.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ratewall_core::{AppError, AppResult};
use ratewall_domain::{AdmissionDecision, ApiKeyValue, ClientIp, RateLimitPolicy, SubjectKind};
use tracing::debug;

use crate::rate_limit_ports::{ApiKeyRepository, SubjectStateRepository};

mod decision;
mod locks;
mod strategy;


pub use locks::SubjectLocks;
pub use strategy::{AdmissionService, AdmissionStrategy};

use decision::{check_block, record_request};

/// Admission use case for anonymous traffic keyed by client IP.
#[derive(Clone)]
pub struct IpAdmissionService {
    repository: Arc<dyn SubjectStateRepository>,
    policy: RateLimitPolicy,
    locks: SubjectLocks,
}

impl IpAdmissionService {
    /// Creates a new IP admission service governed by one shared policy.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SubjectStateRepository>,
        policy: RateLimitPolicy,
        locks: SubjectLocks,
    ) -> Self {
        Self {
            repository,
            policy,
            locks,
        }
    }

    /// Returns the policy applied to every IP.
    #[must_use]
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Decides whether a request from `ip` at `now` is admitted.
    pub async fn register(&self, ip: &ClientIp, now: DateTime<Utc>) -> AppResult<AdmissionDecision> {
        let subject = ip.as_str();
        let _guard = self.locks.acquire(SubjectKind::Ip, subject).await;

        if let Some(denied) = check_block(self.repository.as_ref(), SubjectKind::Ip, subject).await? {
            return Ok(denied);
        }

        record_request(
            self.repository.as_ref(),
            SubjectKind::Ip,
            subject,
            &self.policy,
            now,
        )
        .await
    }
}

/// Admission use case for requests presenting an API key.
#[derive(Clone)]
pub struct ApiKeyAdmissionService {
    repository: Arc<dyn ApiKeyRepository>,
    locks: SubjectLocks,
}

impl ApiKeyAdmissionService {
    /// Creates a new API key admission service.
    #[must_use]
    pub fn new(repository: Arc<dyn ApiKeyRepository>, locks: SubjectLocks) -> Self {
        Self { repository, locks }
    }

    /// Decides whether a request presenting `key` at `now` is admitted.
    ///
    /// An unregistered key fails with [`AppError::KeyNotFound`] and leaves
    /// no state behind.
    pub async fn register(
        &self,
        key: &ApiKeyValue,
        now: DateTime<Utc>,
    ) -> AppResult<AdmissionDecision> {
        let subject = key.as_str();
        let _guard = self.locks.acquire(SubjectKind::ApiKey, subject).await;

        if let Some(denied) =
            check_block(self.repository.as_ref(), SubjectKind::ApiKey, subject).await?
        {
            return Ok(denied);
        }

        let Some(policy) = self.repository.fetch_policy(key).await? else {
            debug!(api_key = %key.redacted(), "unregistered api key presented");
            return Err(AppError::KeyNotFound(key.redacted()));
        };

        record_request(
            self.repository.as_ref(),
            SubjectKind::ApiKey,
            subject,
            &policy,
            now,
        )
        .await
    }
}
