use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use ratewall_core::{AppError, AppResult};
use ratewall_domain::{AdmissionDecision, ApiKeyValue, ClientIp, SubjectKind};

use super::{ApiKeyAdmissionService, IpAdmissionService};

/// Which admission use case governs a request.
///
/// A credential fully switches the governing policy; the two are never
/// combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionStrategy {
    /// Governed by the presented key's own policy.
    ApiKey(ApiKeyValue),
    /// Governed by the process-wide IP policy.
    Ip(ClientIp),
}

impl AdmissionStrategy {
    /// Selects the strategy from the credential header and the transport
    /// remote address.
    ///
    /// A non-blank credential selects the API key path regardless of the
    /// remote address. Without one, the remote address is required.
    pub fn select(credential: Option<&str>, remote_address: Option<SocketAddr>) -> AppResult<Self> {
        if let Some(key) = credential.and_then(|value| ApiKeyValue::new(value).ok()) {
            return Ok(Self::ApiKey(key));
        }

        remote_address
            .map(|address| Self::Ip(ClientIp::from(address)))
            .ok_or_else(|| {
                AppError::Internal("request has no remote address to rate limit".to_owned())
            })
    }

    /// Returns the kind of subject the strategy governs.
    #[must_use]
    pub fn subject_kind(&self) -> SubjectKind {
        match self {
            Self::ApiKey(_) => SubjectKind::ApiKey,
            Self::Ip(_) => SubjectKind::Ip,
        }
    }
}

/// Dispatches a request to the use case its strategy selects.
#[derive(Clone)]
pub struct AdmissionService {
    ip: IpAdmissionService,
    api_key: ApiKeyAdmissionService,
}

impl AdmissionService {
    /// Creates a new admission service.
    #[must_use]
    pub fn new(ip: IpAdmissionService, api_key: ApiKeyAdmissionService) -> Self {
        Self { ip, api_key }
    }

    /// Runs the selected use case for a request arriving at `now`.
    pub async fn admit(
        &self,
        strategy: &AdmissionStrategy,
        now: DateTime<Utc>,
    ) -> AppResult<AdmissionDecision> {
        match strategy {
            AdmissionStrategy::ApiKey(key) => self.api_key.register(key, now).await,
            AdmissionStrategy::Ip(ip) => self.ip.register(ip, now).await,
        }
    }
}
