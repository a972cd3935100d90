//! Shared primitives for all Rust crates in Ratewall.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Ratewall crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
///
/// Rate-limit denials are not errors; they are reported as admission
/// decisions. Everything here is a fault the caller must surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A rate limit policy with a non-positive limit, window or block duration.
    #[error("invalid rate limit policy: {0}")]
    InvalidPolicy(String),

    /// The presented API key has no stored policy.
    #[error("api key not found: {0}")]
    KeyNotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal unexpected error, including every storage failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true when the error originates from infrastructure or
    /// configuration rather than from the caller's input.
    #[must_use]
    pub fn is_server_fault(&self) -> bool {
        matches!(self, Self::InvalidPolicy(_) | Self::Internal(_))
    }
}
