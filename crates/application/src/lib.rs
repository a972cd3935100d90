//! Application services and ports.

#![forbid(unsafe_code)]

mod admission_service;
mod api_key_service;
mod rate_limit_ports;

pub use admission_service::{
    AdmissionService, AdmissionStrategy, ApiKeyAdmissionService, IpAdmissionService, SubjectLocks,
};
pub use api_key_service::ApiKeyService;
pub use rate_limit_ports::{
    ApiKeyRepository, Clock, ManualClock, SubjectStateRepository, SystemClock,
};
