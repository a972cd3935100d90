use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use ratewall_application::AdmissionStrategy;
use ratewall_domain::AdmissionDecision;
use tracing::debug;

use crate::error::{ApiResult, denied_response};
use crate::state::AppState;

/// Request header carrying an API key credential.
pub const API_KEY_HEADER: &str = "api_key";

/// Admission gate: runs one decision per request before the handler.
///
/// A request with a non-blank credential header is governed by that key's
/// policy; any other request is governed by the IP policy of its remote
/// address. Header bytes outside visible ASCII are decoded lossily, so such a
/// credential is still treated as a key and never as a missing header.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let credential = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
    let remote_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| *address);

    let strategy = AdmissionStrategy::select(credential.as_deref(), remote_address)?;
    let decision = state
        .admission_service
        .admit(&strategy, state.clock.now())
        .await?;

    match decision {
        AdmissionDecision::Allowed => Ok(next.run(request).await),
        AdmissionDecision::Denied(denial) => {
            debug!(
                subject_kind = %denial.subject_kind,
                reason = ?denial.reason,
                "request denied"
            );
            Ok(denied_response(&denial))
        }
    }
}
