use async_trait::async_trait;
use ratewall_core::AppResult;
use ratewall_domain::{ApiKey, ApiKeyValue, RateLimitPolicy, SlidingWindow};

/// Repository port for the rate limit state of one subject kind.
///
/// Implementations own a namespace per kind, so the same literal subject
/// stored by an IP repository and an API key repository never collides.
/// Calls are independent reads and writes, not a transaction.
#[async_trait]
pub trait SubjectStateRepository: Send + Sync {
    /// Returns the stored window of a subject, or `None` when nothing has
    /// been recorded yet.
    async fn fetch_window(&self, subject: &str) -> AppResult<Option<SlidingWindow>>;

    /// Replaces the stored window of a subject.
    async fn persist_window(&self, subject: &str, window: &SlidingWindow) -> AppResult<()>;

    /// Returns whether an unexpired block marker exists for the subject.
    async fn fetch_block_marker(&self, subject: &str) -> AppResult<bool>;

    /// Stores a block marker that expires on its own after `duration_seconds`.
    async fn arm_block_marker(&self, subject: &str, duration_seconds: i64) -> AppResult<()>;
}

/// Repository port for API key subjects, which also carry their own policy.
#[async_trait]
pub trait ApiKeyRepository: SubjectStateRepository {
    /// Returns the policy stored for a credential, or `None` when the
    /// credential was never registered.
    async fn fetch_policy(&self, key: &ApiKeyValue) -> AppResult<Option<RateLimitPolicy>>;

    /// Stores a newly issued key.
    ///
    /// Fails with `AppError::Conflict` when the credential already exists.
    async fn persist_policy(&self, key: &ApiKey) -> AppResult<()>;
}
