//! Process-local subject state repositories for development and tests.
//!
//! Entries carry an expiry instant taken from the injected clock and are
//! dropped lazily when read after that instant. Once a table holds more than
//! its capacity, writes sweep every expired entry. Nothing is shared between
//! processes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use ratewall_application::{ApiKeyRepository, Clock, SubjectStateRepository};
use ratewall_core::{AppError, AppResult};
use ratewall_domain::{ApiKey, ApiKeyValue, RateLimitPolicy, SlidingWindow};
use tokio::sync::RwLock;

/// Table size above which writes sweep expired entries.
const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone)]
struct ExpiringEntry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

/// Windows and block markers of one subject kind.
struct InMemorySubjectStore {
    clock: Arc<dyn Clock>,
    sweep_threshold: usize,
    windows: RwLock<HashMap<String, ExpiringEntry<SlidingWindow>>>,
    blocks: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemorySubjectStore {
    fn new(clock: Arc<dyn Clock>, sweep_threshold: usize) -> Self {
        Self {
            clock,
            sweep_threshold: sweep_threshold.max(1),
            windows: RwLock::new(HashMap::new()),
            blocks: RwLock::new(HashMap::new()),
        }
    }

    fn expiry_after(&self, seconds: i64, name: &str) -> AppResult<DateTime<Utc>> {
        if seconds <= 0 {
            return Err(AppError::InvalidPolicy(format!(
                "{name} must be greater than zero"
            )));
        }

        TimeDelta::try_seconds(seconds)
            .and_then(|duration| self.clock.now().checked_add_signed(duration))
            .ok_or_else(|| {
                AppError::InvalidPolicy(format!("{name} of {seconds} seconds is out of range"))
            })
    }

    async fn fetch_window(&self, subject: &str) -> AppResult<Option<SlidingWindow>> {
        let now = self.clock.now();
        {
            let windows = self.windows.read().await;
            match windows.get(subject) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut windows = self.windows.write().await;
        if windows
            .get(subject)
            .is_some_and(|entry| entry.expires_at <= now)
        {
            windows.remove(subject);
        }

        Ok(None)
    }

    async fn persist_window(&self, subject: &str, window: &SlidingWindow) -> AppResult<()> {
        let expires_at = self.expiry_after(window.time_window_seconds(), "time window")?;

        let mut windows = self.windows.write().await;
        windows.insert(
            subject.to_owned(),
            ExpiringEntry {
                value: window.clone(),
                expires_at,
            },
        );

        if windows.len() > self.sweep_threshold {
            let now = self.clock.now();
            windows.retain(|_, entry| entry.expires_at > now);
        }

        Ok(())
    }

    async fn fetch_block_marker(&self, subject: &str) -> AppResult<bool> {
        let now = self.clock.now();
        {
            let blocks = self.blocks.read().await;
            match blocks.get(subject) {
                Some(expires_at) if *expires_at > now => return Ok(true),
                Some(_) => {}
                None => return Ok(false),
            }
        }

        let mut blocks = self.blocks.write().await;
        if blocks
            .get(subject)
            .is_some_and(|expires_at| *expires_at <= now)
        {
            blocks.remove(subject);
        }

        Ok(false)
    }

    async fn arm_block_marker(&self, subject: &str, duration_seconds: i64) -> AppResult<()> {
        let expires_at = self.expiry_after(duration_seconds, "block duration")?;

        let mut blocks = self.blocks.write().await;
        blocks.insert(subject.to_owned(), expires_at);

        if blocks.len() > self.sweep_threshold {
            let now = self.clock.now();
            blocks.retain(|_, expires_at| *expires_at > now);
        }

        Ok(())
    }
}

/// In-memory IP subject state repository.
pub struct InMemoryIpRepository {
    store: InMemorySubjectStore,
}

impl InMemoryIpRepository {
    /// Creates an empty repository whose expiry follows `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_sweep_threshold(clock, DEFAULT_SWEEP_THRESHOLD)
    }

    /// Creates an empty repository that sweeps expired entries once a table
    /// holds more than `sweep_threshold` subjects.
    #[must_use]
    pub fn with_sweep_threshold(clock: Arc<dyn Clock>, sweep_threshold: usize) -> Self {
        Self {
            store: InMemorySubjectStore::new(clock, sweep_threshold),
        }
    }
}

#[async_trait]
impl SubjectStateRepository for InMemoryIpRepository {
    async fn fetch_window(&self, subject: &str) -> AppResult<Option<SlidingWindow>> {
        self.store.fetch_window(subject).await
    }

    async fn persist_window(&self, subject: &str, window: &SlidingWindow) -> AppResult<()> {
        self.store.persist_window(subject, window).await
    }

    async fn fetch_block_marker(&self, subject: &str) -> AppResult<bool> {
        self.store.fetch_block_marker(subject).await
    }

    async fn arm_block_marker(&self, subject: &str, duration_seconds: i64) -> AppResult<()> {
        self.store.arm_block_marker(subject, duration_seconds).await
    }
}

/// In-memory API key repository. Issued policies never expire.
pub struct InMemoryApiKeyRepository {
    store: InMemorySubjectStore,
    policies: RwLock<HashMap<String, RateLimitPolicy>>,
}

impl InMemoryApiKeyRepository {
    /// Creates an empty repository whose expiry follows `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_sweep_threshold(clock, DEFAULT_SWEEP_THRESHOLD)
    }

    /// Creates an empty repository that sweeps expired windows and block
    /// markers once a table holds more than `sweep_threshold` subjects.
    #[must_use]
    pub fn with_sweep_threshold(clock: Arc<dyn Clock>, sweep_threshold: usize) -> Self {
        Self {
            store: InMemorySubjectStore::new(clock, sweep_threshold),
            policies: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SubjectStateRepository for InMemoryApiKeyRepository {
    async fn fetch_window(&self, subject: &str) -> AppResult<Option<SlidingWindow>> {
        self.store.fetch_window(subject).await
    }

    async fn persist_window(&self, subject: &str, window: &SlidingWindow) -> AppResult<()> {
        self.store.persist_window(subject, window).await
    }

    async fn fetch_block_marker(&self, subject: &str) -> AppResult<bool> {
        self.store.fetch_block_marker(subject).await
    }

    async fn arm_block_marker(&self, subject: &str, duration_seconds: i64) -> AppResult<()> {
        self.store.arm_block_marker(subject, duration_seconds).await
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn fetch_policy(&self, key: &ApiKeyValue) -> AppResult<Option<RateLimitPolicy>> {
        Ok(self.policies.read().await.get(key.as_str()).copied())
    }

    async fn persist_policy(&self, key: &ApiKey) -> AppResult<()> {
        let mut policies = self.policies.write().await;
        if policies.contains_key(key.value().as_str()) {
            return Err(AppError::Conflict("api key already exists".to_owned()));
        }

        policies.insert(key.value().as_str().to_owned(), key.policy());
        Ok(())
    }
}
