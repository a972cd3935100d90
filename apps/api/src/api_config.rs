use std::env;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use ratewall_core::AppError;
use ratewall_domain::RateLimitPolicy;
use tracing_subscriber::EnvFilter;

/// Backing store for windows, block markers and API key policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStoreConfig {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub rate_limit_store: RateLimitStoreConfig,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub ip_policy: RateLimitPolicy,
    pub subject_lock_capacity: usize,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or(&lookup, "API_PORT", 8080_u16)?;

        let rate_limit_store = match lookup("RATE_LIMIT_STORE")
            .unwrap_or_else(|| "redis".to_owned())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "redis" => RateLimitStoreConfig::Redis,
            "memory" => RateLimitStoreConfig::Memory,
            other => {
                return Err(AppError::Validation(format!(
                    "RATE_LIMIT_STORE must be either 'redis' or 'memory', got '{other}'"
                )));
            }
        };

        let redis_url = lookup("REDIS_URL").filter(|value| !value.trim().is_empty());
        if rate_limit_store == RateLimitStoreConfig::Redis && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned(),
            ));
        }

        let redis_key_prefix = lookup("REDIS_KEY_PREFIX")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "ratewall".to_owned());

        let ip_policy = RateLimitPolicy::new(
            parse_or(&lookup, "IP_MAX_REQUESTS", 10)?,
            parse_or(&lookup, "IP_TIME_WINDOW_SECONDS", 1)?,
            parse_or(&lookup, "IP_BLOCK_DURATION_SECONDS", 300)?,
        );
        ip_policy
            .validate()
            .map_err(|error| AppError::Validation(format!("invalid IP rate limit policy: {error}")))?;

        let subject_lock_capacity = parse_or(&lookup, "SUBJECT_LOCK_CAPACITY", 10_000_usize)?;

        Ok(Self {
            api_host,
            api_port,
            rate_limit_store,
            redis_url,
            redis_key_prefix,
            ip_policy,
            subject_lock_capacity,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        None => Ok(default),
    }
}
