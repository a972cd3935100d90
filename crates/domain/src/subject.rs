//! Rate-limited principals: client IP addresses and API keys.

use std::fmt::{Display, Formatter};
use std::net::{IpAddr, SocketAddr};

use ratewall_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::window::RateLimitPolicy;

/// Length in bytes of the random material behind an API key.
pub const API_KEY_BYTES: usize = 32;

/// The kind of principal a request is attributed to.
///
/// Each kind owns a disjoint storage namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    /// Anonymous traffic keyed by client address.
    Ip,
    /// Traffic presenting an API key credential.
    ApiKey,
}

impl SubjectKind {
    /// Returns the stable storage label of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::ApiKey => "api-key",
        }
    }
}

impl Display for SubjectKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Textual client address with the port stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIp(String);

impl ClientIp {
    /// Creates a client IP from its textual form.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?.into()))
    }

    /// Returns the textual address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<IpAddr> for ClientIp {
    fn from(value: IpAddr) -> Self {
        Self(value.to_string())
    }
}

impl From<SocketAddr> for ClientIp {
    fn from(value: SocketAddr) -> Self {
        Self::from(value.ip())
    }
}

impl Display for ClientIp {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Opaque API key credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiKeyValue(String);

impl ApiKeyValue {
    /// Wraps a credential presented by a client.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?.into()))
    }

    /// Builds a credential by hex-encoding random bytes.
    #[must_use]
    pub fn from_random_bytes(bytes: &[u8; API_KEY_BYTES]) -> Self {
        use std::fmt::Write;

        let encoded = bytes
            .iter()
            .fold(String::with_capacity(API_KEY_BYTES * 2), |mut acc, byte| {
                let _ = write!(acc, "{byte:02x}");
                acc
            });

        Self(encoded)
    }

    /// Returns the credential.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns a shortened form that is safe to log.
    #[must_use]
    pub fn redacted(&self) -> String {
        let prefix: String = self.as_str().chars().take(8).collect();
        format!("{prefix}...")
    }
}

/// An API key together with the policy it was issued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    value: ApiKeyValue,
    policy: RateLimitPolicy,
}

impl ApiKey {
    /// Creates an API key after validating its policy.
    pub fn new(value: ApiKeyValue, policy: RateLimitPolicy) -> AppResult<Self> {
        policy.validate()?;
        Ok(Self { value, policy })
    }

    /// Returns the credential.
    #[must_use]
    pub fn value(&self) -> &ApiKeyValue {
        &self.value
    }

    /// Returns the key's own policy.
    #[must_use]
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }
}
