//! Sliding-window request counting and the policy that parameterises it.

use chrono::{DateTime, TimeDelta, Utc};
use ratewall_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Upper bound for time windows and block durations: one year in seconds.
pub const MAX_DURATION_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Rate limit policy governing one subject.
///
/// IP traffic shares one process-wide policy; every API key carries its own.
/// Values are kept as plain integers so a policy read from storage can be
/// represented even when it is invalid, and rejected by [`Self::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum number of requests admitted within one window.
    pub max_requests: i64,
    /// Width of the rolling window in seconds.
    pub time_window_seconds: i64,
    /// How long a subject stays blocked after exceeding the limit, in seconds.
    pub block_duration_seconds: i64,
}

impl RateLimitPolicy {
    /// Creates a policy without validating it.
    #[must_use]
    pub fn new(max_requests: i64, time_window_seconds: i64, block_duration_seconds: i64) -> Self {
        Self {
            max_requests,
            time_window_seconds,
            block_duration_seconds,
        }
    }

    /// Validates the window parameters and the block duration.
    pub fn validate(&self) -> AppResult<()> {
        validate_window(self.max_requests, self.time_window_seconds)?;

        if self.block_duration_seconds <= 0 {
            return Err(AppError::InvalidPolicy(
                "block duration must be greater than zero".to_owned(),
            ));
        }

        if self.block_duration_seconds > MAX_DURATION_SECONDS {
            return Err(AppError::InvalidPolicy(format!(
                "block duration must not exceed {MAX_DURATION_SECONDS} seconds"
            )));
        }

        Ok(())
    }
}

fn validate_window(max_requests: i64, time_window_seconds: i64) -> AppResult<()> {
    if max_requests <= 0 {
        return Err(AppError::InvalidPolicy(
            "max requests must be greater than zero".to_owned(),
        ));
    }

    if time_window_seconds <= 0 {
        return Err(AppError::InvalidPolicy(
            "time window must be greater than zero".to_owned(),
        ));
    }

    if time_window_seconds > MAX_DURATION_SECONDS {
        return Err(AppError::InvalidPolicy(format!(
            "time window must not exceed {MAX_DURATION_SECONDS} seconds"
        )));
    }

    Ok(())
}

/// Request timestamps of one subject inside a rolling time window.
///
/// Timestamps are always kept in chronological order. The raw sequence is
/// only readable from outside; it changes through [`Self::prune`],
/// [`Self::add_request`] and [`Self::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidingWindow {
    timestamps: Vec<DateTime<Utc>>,
    max_requests: i64,
    time_window_seconds: i64,
}

impl SlidingWindow {
    /// Creates a window from previously recorded timestamps.
    ///
    /// Fails with [`AppError::InvalidPolicy`] when either limit is not positive
    /// or the window exceeds [`MAX_DURATION_SECONDS`].
    pub fn new(
        max_requests: i64,
        time_window_seconds: i64,
        mut timestamps: Vec<DateTime<Utc>>,
    ) -> AppResult<Self> {
        validate_window(max_requests, time_window_seconds)?;
        timestamps.sort_unstable();

        Ok(Self {
            timestamps,
            max_requests,
            time_window_seconds,
        })
    }

    /// Creates a window governed by the given policy.
    pub fn for_policy(policy: &RateLimitPolicy, timestamps: Vec<DateTime<Utc>>) -> AppResult<Self> {
        Self::new(policy.max_requests, policy.time_window_seconds, timestamps)
    }

    /// Returns the recorded timestamps, oldest first.
    #[must_use]
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Consumes the window and returns its timestamps.
    #[must_use]
    pub fn into_timestamps(self) -> Vec<DateTime<Utc>> {
        self.timestamps
    }

    /// Returns the number of recorded timestamps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns true when no timestamp is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Returns the count threshold of the window.
    #[must_use]
    pub fn max_requests(&self) -> i64 {
        self.max_requests
    }

    /// Returns the window width in seconds.
    #[must_use]
    pub fn time_window_seconds(&self) -> i64 {
        self.time_window_seconds
    }

    /// Returns the window width.
    #[must_use]
    pub fn time_window(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.time_window_seconds).unwrap_or(TimeDelta::MAX)
    }

    /// Drops every timestamp at or before `now - time_window`.
    ///
    /// Timestamps after `now` are kept. Returns how many entries were removed.
    /// Nothing is removed when the threshold falls before the earliest
    /// representable instant.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let Some(threshold) = now.checked_sub_signed(self.time_window()) else {
            return 0;
        };
        let first_live = self
            .timestamps
            .partition_point(|timestamp| *timestamp <= threshold);
        self.timestamps.drain(..first_live);
        first_live
    }

    /// Prunes the window and reports whether its count is within the limit.
    ///
    /// The count includes the request being decided when the caller has
    /// already appended it, so a window holding `max_requests` entries plus
    /// the new one is refused.
    pub fn allow(&mut self, now: DateTime<Utc>) -> bool {
        self.prune(now);
        self.count() <= self.max_requests
    }

    /// Records a request timestamp without pruning.
    pub fn add_request(&mut self, timestamp: DateTime<Utc>) {
        let position = self.timestamps.partition_point(|existing| *existing <= timestamp);
        self.timestamps.insert(position, timestamp);
    }

    /// Records the request at `now` and decides whether it is admitted.
    ///
    /// The request occupies a slot whether or not it is admitted.
    pub fn register(&mut self, now: DateTime<Utc>) -> bool {
        self.add_request(now);
        self.allow(now)
    }

    fn count(&self) -> i64 {
        i64::try_from(self.timestamps.len()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 34, 56)
            .single()
            .unwrap_or_else(|| panic!("valid start time"))
    }

    fn window(max_requests: i64, time_window_seconds: i64, offsets_ms: &[i64]) -> SlidingWindow {
        let timestamps = offsets_ms
            .iter()
            .map(|offset| start() + Duration::milliseconds(*offset))
            .collect();
        SlidingWindow::new(max_requests, time_window_seconds, timestamps)
            .unwrap_or_else(|error| panic!("valid window: {error}"))
    }

    #[test]
    fn prune_keeps_recent_and_future_entries() {
        let mut window = window(10, 1, &[0, 1_000]);
        assert_eq!(window.prune(start()), 0);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn prune_removes_every_expired_entry() {
        let mut window = window(10, 1, &[-4_000, -3_000, -2_000, -1_000, 0, 1_000]);
        assert_eq!(window.prune(start()), 4);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn prune_treats_the_threshold_as_expired() {
        let mut window = window(10, 1, &[-1_000, 0]);
        window.prune(start());
        assert_eq!(window.timestamps(), &[start()]);
    }

    #[test]
    fn prune_empties_a_fully_expired_window() {
        let mut window = window(10, 1, &[-5_000, -4_000, -3_000]);
        window.prune(start());
        assert!(window.is_empty());
    }

    #[test]
    fn allow_admits_up_to_max_requests() {
        let offsets: Vec<i64> = (0..10).map(|index| -90 + index * 10).collect();
        let mut window = window(10, 1, &offsets);
        assert!(window.allow(start()));
    }

    #[test]
    fn allow_refuses_one_past_max_requests() {
        let offsets: Vec<i64> = (0..11).map(|index| -100 + index * 10).collect();
        let mut window = window(10, 1, &offsets);
        assert!(!window.allow(start()));
    }

    #[test]
    fn allow_only_counts_entries_inside_the_window() {
        let offsets: Vec<i64> = (0..15).map(|index| -14_000 + index * 1_000).collect();
        let mut window = window(11, 10, &offsets);
        assert!(window.allow(start()));
        assert_eq!(window.len(), 10);
    }

    #[test]
    fn register_admits_exactly_max_requests() {
        let mut window = window(2, 1, &[]);
        assert!(window.register(start()));
        assert!(window.register(start() + Duration::milliseconds(300)));
        assert!(!window.register(start() + Duration::milliseconds(400)));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn register_admits_again_once_old_entries_leave_the_window() {
        let mut window = window(1, 1, &[]);
        assert!(window.register(start()));
        assert!(window.register(start() + Duration::milliseconds(1_001)));
    }

    #[test]
    fn add_request_keeps_chronological_order() {
        let mut window = window(10, 60, &[0, 2_000]);
        window.add_request(start() + Duration::milliseconds(1_000));
        let offsets: Vec<i64> = window
            .timestamps()
            .iter()
            .map(|timestamp| (*timestamp - start()).num_milliseconds())
            .collect();
        assert_eq!(offsets, vec![0, 1_000, 2_000]);
    }

    #[test]
    fn non_positive_limits_are_rejected() {
        assert!(matches!(
            SlidingWindow::new(0, 1, Vec::new()),
            Err(AppError::InvalidPolicy(_))
        ));
        assert!(matches!(
            SlidingWindow::new(1, 0, Vec::new()),
            Err(AppError::InvalidPolicy(_))
        ));
        assert!(matches!(
            SlidingWindow::new(-3, 5, Vec::new()),
            Err(AppError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn durations_beyond_one_year_are_rejected() {
        let huge = 1_000_000_000_000_000;
        assert!(matches!(
            RateLimitPolicy::new(5, huge, 300).validate(),
            Err(AppError::InvalidPolicy(_))
        ));
        assert!(matches!(
            RateLimitPolicy::new(5, 60, huge).validate(),
            Err(AppError::InvalidPolicy(_))
        ));
        assert!(matches!(
            SlidingWindow::new(5, i64::MAX, Vec::new()),
            Err(AppError::InvalidPolicy(_))
        ));
        assert!(
            RateLimitPolicy::new(5, MAX_DURATION_SECONDS, MAX_DURATION_SECONDS)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn longest_window_registers_without_overflow() {
        let mut window = window(1, MAX_DURATION_SECONDS, &[]);
        assert!(window.register(start()));
        assert!(!window.register(start() + Duration::seconds(MAX_DURATION_SECONDS - 1)));
    }

    #[test]
    fn prune_near_the_earliest_instant_keeps_everything() {
        let earliest = DateTime::<Utc>::MIN_UTC + Duration::seconds(1);
        let mut window = SlidingWindow::new(5, 60, vec![earliest])
            .unwrap_or_else(|error| panic!("valid window: {error}"));

        assert_eq!(window.prune(earliest), 0);
        assert!(window.allow(earliest));
    }

    #[test]
    fn policy_requires_positive_block_duration() {
        assert!(RateLimitPolicy::new(5, 60, 300).validate().is_ok());
        assert!(matches!(
            RateLimitPolicy::new(5, 60, 0).validate(),
            Err(AppError::InvalidPolicy(_))
        ));
    }

    proptest! {
        #[test]
        fn pruning_twice_is_a_no_op(
            mut offsets in proptest::collection::vec(-120_000_i64..120_000, 0..64),
            time_window_seconds in 1_i64..90,
        ) {
            offsets.sort_unstable();
            let mut window = window(1_000, time_window_seconds, &offsets);
            window.prune(start());
            let pruned = window.clone();

            prop_assert_eq!(window.prune(start()), 0);
            prop_assert_eq!(window, pruned);
        }

        #[test]
        fn survivors_are_strictly_newer_than_the_threshold(
            offsets in proptest::collection::vec(-120_000_i64..120_000, 0..64),
            time_window_seconds in 1_i64..90,
        ) {
            let mut window = window(1_000, time_window_seconds, &offsets);
            window.prune(start());
            let threshold = start() - Duration::seconds(time_window_seconds);

            prop_assert!(window.timestamps().iter().all(|timestamp| *timestamp > threshold));
            let expected = offsets
                .iter()
                .filter(|offset| start() + Duration::milliseconds(**offset) > threshold)
                .count();
            prop_assert_eq!(window.len(), expected);
        }
    }
}
