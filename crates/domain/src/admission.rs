//! Outcome of one admission decision.

use serde::{Deserialize, Serialize};

use crate::subject::SubjectKind;

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    /// An unexpired block marker exists; the window was not consulted.
    Blocked,
    /// The window count exceeded the limit and a block marker was armed.
    LimitExceeded,
}

/// A refused request and the subject it was attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    /// Which kind of subject governed the request.
    pub subject_kind: SubjectKind,
    /// Why the request was refused.
    pub reason: DenialReason,
}

impl Denial {
    /// Creates a denial.
    #[must_use]
    pub fn new(subject_kind: SubjectKind, reason: DenialReason) -> Self {
        Self {
            subject_kind,
            reason,
        }
    }

    /// Returns the client-facing reason, worded per subject kind.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self.subject_kind {
            SubjectKind::Ip => {
                "you have reached the maximum number of requests or actions allowed by ip within a certain time frame"
            }
            SubjectKind::ApiKey => {
                "you have reached the maximum number of requests or actions allowed by api key within a certain time frame"
            }
        }
    }
}

/// Verdict of one admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionDecision {
    /// The request may proceed.
    Allowed,
    /// The request must be refused.
    Denied(Denial),
}

impl AdmissionDecision {
    /// Returns true when the request may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Returns the denial, if any.
    #[must_use]
    pub fn denial(&self) -> Option<Denial> {
        match self {
            Self::Allowed => None,
            Self::Denied(denial) => Some(*denial),
        }
    }
}
