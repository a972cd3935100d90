use chrono::{DateTime, Utc};
use ratewall_core::AppResult;
use ratewall_domain::{
    AdmissionDecision, Denial, DenialReason, RateLimitPolicy, SlidingWindow, SubjectKind,
};
use tracing::{debug, warn};

use crate::rate_limit_ports::SubjectStateRepository;

/// Returns a denial when the subject carries an unexpired block marker.
///
/// A blocked subject's window is neither read nor written.
pub(super) async fn check_block<R>(
    repository: &R,
    kind: SubjectKind,
    subject: &str,
) -> AppResult<Option<AdmissionDecision>>
where
    R: SubjectStateRepository + ?Sized,
{
    if repository.fetch_block_marker(subject).await? {
        debug!(subject_kind = %kind, "subject is blocked");
        return Ok(Some(AdmissionDecision::Denied(Denial::new(
            kind,
            DenialReason::Blocked,
        ))));
    }

    Ok(None)
}

/// Appends the request to the subject's window and decides on the result.
///
/// The window is persisted for both outcomes. A denial arms a block marker
/// for the policy's block duration.
pub(super) async fn record_request<R>(
    repository: &R,
    kind: SubjectKind,
    subject: &str,
    policy: &RateLimitPolicy,
    now: DateTime<Utc>,
) -> AppResult<AdmissionDecision>
where
    R: SubjectStateRepository + ?Sized,
{
    let timestamps = repository
        .fetch_window(subject)
        .await?
        .map(SlidingWindow::into_timestamps)
        .unwrap_or_default();

    policy.validate()?;
    let mut window = SlidingWindow::for_policy(policy, timestamps)?;

    let allowed = window.register(now);
    repository.persist_window(subject, &window).await?;

    if allowed {
        return Ok(AdmissionDecision::Allowed);
    }

    repository
        .arm_block_marker(subject, policy.block_duration_seconds)
        .await?;
    warn!(
        subject_kind = %kind,
        count = window.len(),
        max_requests = policy.max_requests,
        block_duration_seconds = policy.block_duration_seconds,
        "rate limit exceeded, subject blocked"
    );

    Ok(AdmissionDecision::Denied(Denial::new(
        kind,
        DenialReason::LimitExceeded,
    )))
}
