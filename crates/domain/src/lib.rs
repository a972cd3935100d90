//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod admission;
mod subject;
mod window;

pub use admission::{AdmissionDecision, Denial, DenialReason};
pub use subject::{API_KEY_BYTES, ApiKey, ApiKeyValue, ClientIp, SubjectKind};
pub use window::{MAX_DURATION_SECONDS, RateLimitPolicy, SlidingWindow};
