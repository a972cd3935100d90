//! Redis-backed subject state repositories.
//!
//! Keys are namespaced per subject kind:
//! `{prefix}:window:{kind}:{subject}`, `{prefix}:block:{kind}:{subject}` and,
//! for API keys, `{prefix}:policy:api-key:{key}`. Windows are stored as JSON
//! with millisecond timestamps and expire together with their time window.
//! Block markers rely on the Redis TTL alone.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ratewall_application::{ApiKeyRepository, SubjectStateRepository};
use ratewall_core::{AppError, AppResult};
use ratewall_domain::{ApiKey, ApiKeyValue, RateLimitPolicy, SlidingWindow, SubjectKind};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};

const BLOCKED_MARKER: &str = "blocked";

#[derive(Debug, Serialize, Deserialize)]
struct StoredWindow {
    max_requests: i64,
    time_window_seconds: i64,
    requests: Vec<i64>,
}

fn encode_window(window: &SlidingWindow) -> AppResult<String> {
    let stored = StoredWindow {
        max_requests: window.max_requests(),
        time_window_seconds: window.time_window_seconds(),
        requests: window
            .timestamps()
            .iter()
            .map(DateTime::timestamp_millis)
            .collect(),
    };

    serde_json::to_string(&stored)
        .map_err(|error| AppError::Internal(format!("failed to encode rate limit window: {error}")))
}

fn decode_window(value: &str) -> AppResult<SlidingWindow> {
    let stored: StoredWindow = serde_json::from_str(value)
        .map_err(|error| AppError::Internal(format!("invalid stored rate limit window: {error}")))?;

    let timestamps = stored
        .requests
        .iter()
        .map(|millis| {
            Utc.timestamp_millis_opt(*millis).single().ok_or_else(|| {
                AppError::Internal(format!("invalid stored request timestamp: {millis}"))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    SlidingWindow::new(stored.max_requests, stored.time_window_seconds, timestamps)
        .map_err(|error| AppError::Internal(format!("invalid stored rate limit window: {error}")))
}

fn positive_seconds(value: i64, name: &str) -> AppResult<u64> {
    u64::try_from(value)
        .ok()
        .filter(|seconds| *seconds > 0)
        .ok_or_else(|| AppError::InvalidPolicy(format!("{name} must be greater than zero")))
}

/// State shared by the per-kind repositories.
#[derive(Clone)]
struct RedisSubjectStore {
    client: redis::Client,
    key_prefix: String,
    kind: SubjectKind,
}

impl RedisSubjectStore {
    fn new(client: redis::Client, key_prefix: impl Into<String>, kind: SubjectKind) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            kind,
        }
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }

    fn window_key(&self, subject: &str) -> String {
        format!("{}:window:{}:{subject}", self.key_prefix, self.kind)
    }

    fn block_key(&self, subject: &str) -> String {
        format!("{}:block:{}:{subject}", self.key_prefix, self.kind)
    }

    async fn fetch_window(&self, subject: &str) -> AppResult<Option<SlidingWindow>> {
        let mut connection = self.connection().await?;
        let encoded: Option<String> = connection.get(self.window_key(subject)).await.map_err(|error| {
            AppError::Internal(format!("failed to read rate limit window: {error}"))
        })?;

        encoded.as_deref().map(decode_window).transpose()
    }

    async fn persist_window(&self, subject: &str, window: &SlidingWindow) -> AppResult<()> {
        let encoded = encode_window(window)?;
        let ttl_seconds = positive_seconds(window.time_window_seconds(), "time window")?;

        let mut connection = self.connection().await?;
        connection
            .set_ex(self.window_key(subject), encoded, ttl_seconds)
            .await
            .map_err(|error| AppError::Internal(format!("failed to write rate limit window: {error}")))
    }

    async fn fetch_block_marker(&self, subject: &str) -> AppResult<bool> {
        let mut connection = self.connection().await?;
        let marker: Option<String> = connection.get(self.block_key(subject)).await.map_err(|error| {
            AppError::Internal(format!("failed to read block marker: {error}"))
        })?;

        Ok(marker.as_deref() == Some(BLOCKED_MARKER))
    }

    async fn arm_block_marker(&self, subject: &str, duration_seconds: i64) -> AppResult<()> {
        let ttl_seconds = positive_seconds(duration_seconds, "block duration")?;

        let mut connection = self.connection().await?;
        connection
            .set_ex(self.block_key(subject), BLOCKED_MARKER, ttl_seconds)
            .await
            .map_err(|error| AppError::Internal(format!("failed to write block marker: {error}")))
    }
}

/// Redis implementation of the IP subject state repository port.
#[derive(Clone)]
pub struct RedisIpRepository {
    store: RedisSubjectStore,
}

impl RedisIpRepository {
    /// Creates a repository with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            store: RedisSubjectStore::new(client, key_prefix, SubjectKind::Ip),
        }
    }
}

#[async_trait]
impl SubjectStateRepository for RedisIpRepository {
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

/// Redis implementation of the API key repository port.
#[derive(Clone)]
pub struct RedisApiKeyRepository {
    store: RedisSubjectStore,
}

impl RedisApiKeyRepository {
    /// Creates a repository with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            store: RedisSubjectStore::new(client, key_prefix, SubjectKind::ApiKey),
        }
    }

    fn policy_key(&self, key: &ApiKeyValue) -> String {
        format!(
            "{}:policy:{}:{}",
            self.store.key_prefix,
            SubjectKind::ApiKey,
            key.as_str()
        )
    }
}

#[async_trait]
impl SubjectStateRepository for RedisApiKeyRepository {
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
impl ApiKeyRepository for RedisApiKeyRepository {
    async fn fetch_policy(&self, key: &ApiKeyValue) -> AppResult<Option<RateLimitPolicy>> {
        let mut connection = self.store.connection().await?;
        let encoded: Option<String> = connection.get(self.policy_key(key)).await.map_err(|error| {
            AppError::Internal(format!("failed to read api key policy: {error}"))
        })?;

        encoded
            .as_deref()
            .map(|value| {
                serde_json::from_str::<RateLimitPolicy>(value).map_err(|error| {
                    AppError::Internal(format!("invalid stored api key policy: {error}"))
                })
            })
            .transpose()
    }

    async fn persist_policy(&self, key: &ApiKey) -> AppResult<()> {
        let encoded = serde_json::to_string(&key.policy())
            .map_err(|error| AppError::Internal(format!("failed to encode api key policy: {error}")))?;

        let mut connection = self.store.connection().await?;
        let stored: Option<String> = redis::cmd("SET")
            .arg(self.policy_key(key.value()))
            .arg(encoded)
            .arg("NX")
            .query_async(&mut connection)
            .await
            .map_err(|error| AppError::Internal(format!("failed to store api key policy: {error}")))?;

        if stored.is_none() {
            return Err(AppError::Conflict("api key already exists".to_owned()));
        }

        Ok(())
    }
}
