use std::sync::Arc;

use ratewall_application::{AdmissionService, ApiKeyService, Clock};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub admission_service: AdmissionService,
    pub api_key_service: ApiKeyService,
    pub clock: Arc<dyn Clock>,
    pub redis_client: Option<redis::Client>,
}
