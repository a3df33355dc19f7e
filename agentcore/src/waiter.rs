//! Bounded status polling for asynchronously provisioned resources
//!
//! A `StateChangeConf` describes one wait: which statuses mean "keep going",
//! which mean "done", how long to wait overall and how many consecutive
//! target observations are needed before the status is trusted. The caller
//! supplies a refresh closure that performs a single read and reduces it to
//! a `PollOutcome`.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tfplug::Context;
use thiserror::Error;
use tokio::time::Instant;

use crate::api::ApiError;

const INITIAL_WAIT: Duration = Duration::from_millis(100);
const MAX_WAIT: Duration = Duration::from_secs(10);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(180);
// Upper bound when neither the caller nor the context yields a usable deadline
const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// Result of one refresh
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Found { resource: T, status: String },
    /// The control plane reports the resource does not exist
    Gone,
}

/// Errors that can mean "the resource does not exist"
pub trait NotFound {
    fn is_not_found(&self) -> bool;
}

impl NotFound for ApiError {
    fn is_not_found(&self) -> bool {
        ApiError::is_not_found(self)
    }
}

impl<T> PollOutcome<T> {
    /// Maps a read into an outcome: not-found becomes `Gone`, any other
    /// error stays an error
    pub fn from_result<E: NotFound>(
        result: Result<T, E>,
        status: impl FnOnce(&T) -> String,
    ) -> Result<Self, E> {
        match result {
            Ok(resource) => {
                let status = status(&resource);
                Ok(PollOutcome::Found { resource, status })
            }
            Err(e) if e.is_not_found() => Ok(PollOutcome::Gone),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError<T: Debug, E: std::error::Error + 'static> {
    #[error("unexpected state '{state}', wanted target '{expected}'")]
    UnexpectedState {
        state: String,
        expected: String,
        last: Option<T>,
    },

    #[error("timeout while waiting for state to become '{expected}' (last state: '{last_state}', timeout: {timeout:?})")]
    Timeout {
        last_state: String,
        expected: String,
        timeout: Duration,
        last: Option<T>,
    },

    #[error("couldn't find resource ({retries} retries)")]
    NotFound { retries: u32 },

    #[error(transparent)]
    Refresh(E),
}

impl<T: Debug, E: std::error::Error + 'static> WaitError<T, E> {
    /// Last resource observed before the wait failed
    pub fn last(&self) -> Option<&T> {
        match self {
            WaitError::UnexpectedState { last, .. } | WaitError::Timeout { last, .. } => {
                last.as_ref()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Sleep before the first refresh
    pub delay: Duration,
    /// Lower bound for the exponential backoff between refreshes
    pub min_timeout: Duration,
    /// Fixed interval between refreshes; ignored when zero or >= 180s
    pub poll_interval: Duration,
    pub not_found_checks: u32,
    pub continuous_target_occurrence: u32,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target_occurrence: 1,
        }
    }

    pub fn continuous_target_occurrence(mut self, count: u32) -> Self {
        self.continuous_target_occurrence = count;
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Polls `refresh` until a target status is seen often enough, the
    /// resource is confirmed gone for a delete wait, or the deadline passes.
    ///
    /// Returns the last resource on success, `None` when a delete wait
    /// finished on absence.
    pub async fn wait_for_state<T, E, F, Fut>(
        &self,
        ctx: &Context,
        mut refresh: F,
    ) -> Result<Option<T>, WaitError<T, E>>
    where
        T: Debug,
        E: std::error::Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollOutcome<T>, E>>,
    {
        let now = Instant::now();
        let deadline = match (ctx.deadline(), now.checked_add(self.timeout)) {
            (Some(ctx_deadline), Some(own)) => ctx_deadline.min(own),
            (Some(ctx_deadline), None) => ctx_deadline,
            (None, Some(own)) => own,
            (None, None) => now + MAX_TIMEOUT,
        };
        let expected = self.target.join(", ");
        let required = self.continuous_target_occurrence.max(1);

        if !self.delay.is_zero() {
            let wake = Instant::now().checked_add(self.delay).unwrap_or(deadline);
            tokio::time::sleep_until(deadline.min(wake)).await;
        }

        let mut wait = INITIAL_WAIT;
        let mut not_found_tick = 0u32;
        let mut target_occurrence = 0u32;
        let mut last_state = String::new();
        let mut last: Option<T> = None;

        loop {
            match refresh().await.map_err(WaitError::Refresh)? {
                PollOutcome::Gone => {
                    last_state.clear();
                    last = None;

                    if self.target.is_empty() {
                        target_occurrence += 1;
                        if target_occurrence >= required {
                            return Ok(None);
                        }
                    } else {
                        not_found_tick += 1;
                        tracing::debug!(
                            "resource not found while waiting for {} ({}/{})",
                            expected,
                            not_found_tick,
                            self.not_found_checks
                        );
                        if not_found_tick > self.not_found_checks {
                            return Err(WaitError::NotFound {
                                retries: not_found_tick,
                            });
                        }
                    }
                }
                PollOutcome::Found { resource, status } => {
                    not_found_tick = 0;
                    tracing::debug!("waiting for state to become: [{}], current: {}", expected, status);

                    if self.target.contains(&status) {
                        target_occurrence += 1;
                        if target_occurrence >= required {
                            return Ok(Some(resource));
                        }
                    } else if self.pending.contains(&status) {
                        target_occurrence = 0;
                    } else if !self.pending.is_empty() {
                        return Err(WaitError::UnexpectedState {
                            state: status,
                            expected,
                            last: Some(resource),
                        });
                    }

                    last_state = status;
                    last = Some(resource);
                }
            }

            if target_occurrence == 0 {
                wait = wait.saturating_mul(2);
            }
            wait = if !self.poll_interval.is_zero() && self.poll_interval < MAX_POLL_INTERVAL {
                self.poll_interval
            } else if wait < self.min_timeout {
                self.min_timeout
            } else {
                wait.min(MAX_WAIT)
            };

            let wake = Instant::now().checked_add(wait).unwrap_or(deadline);
            if wake > deadline {
                tokio::time::sleep_until(deadline).await;
                return Err(WaitError::Timeout {
                    last_state,
                    expected,
                    timeout: self.timeout,
                    last,
                });
            }
            tokio::time::sleep_until(wake).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    /// Refresh that replays `script` and repeats its last entry
    fn scripted<'a>(
        script: Vec<Option<&'static str>>,
        calls: &'a AtomicUsize,
    ) -> impl FnMut() -> std::future::Ready<Result<PollOutcome<&'static str>, Boom>> + 'a {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let step = script[n.min(script.len() - 1)];
            std::future::ready(Ok(match step {
                Some(status) => PollOutcome::Found {
                    resource: status,
                    status: status.to_string(),
                },
                None => PollOutcome::Gone,
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn target_on_first_poll() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], Duration::from_secs(60));

        let result = conf
            .wait_for_state(&Context::new(), scripted(vec![Some("READY")], &calls))
            .await
            .unwrap();

        assert_eq!(result, Some("READY"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_forever_times_out_at_deadline() {
        let calls = AtomicUsize::new(0);
        let timeout = Duration::from_secs(300);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], timeout);
        let start = Instant::now();

        let err = conf
            .wait_for_state(&Context::new(), scripted(vec![Some("CREATING")], &calls))
            .await
            .unwrap_err();

        assert_eq!(start.elapsed(), timeout);
        match err {
            WaitError::Timeout {
                last_state, last, ..
            } => {
                assert_eq!(last_state, "CREATING");
                assert_eq!(last, Some("CREATING"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn context_deadline_wins_when_sooner() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["UPDATING"], &["READY"], Duration::from_secs(3600));
        let ctx = Context::new().with_timeout(Duration::from_secs(30));
        let start = Instant::now();

        let err = conf
            .wait_for_state(&ctx, scripted(vec![Some("UPDATING")], &calls))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Timeout { .. }));
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_wait_succeeds_on_first_absence() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["DELETING"], &[], Duration::from_secs(60));

        let result = conf
            .wait_for_state(&Context::new(), scripted(vec![None], &calls))
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flapping_target_needs_consecutive_hits() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], Duration::from_secs(60))
            .continuous_target_occurrence(2);

        let result = conf
            .wait_for_state(
                &Context::new(),
                scripted(
                    vec![Some("READY"), Some("CREATING"), Some("READY"), Some("READY")],
                    &calls,
                ),
            )
            .await
            .unwrap();

        assert_eq!(result, Some("READY"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_status_fails_with_last_resource() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], Duration::from_secs(60));

        let err = conf
            .wait_for_state(
                &Context::new(),
                scripted(vec![Some("CREATING"), Some("CREATE_FAILED")], &calls),
            )
            .await
            .unwrap_err();

        assert_eq!(err.last(), Some(&"CREATE_FAILED"));
        assert!(err.to_string().contains("CREATE_FAILED"));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_tolerated_without_pending_set() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&[], &["READY"], Duration::from_secs(60));

        let result = conf
            .wait_for_state(
                &Context::new(),
                scripted(vec![Some("SOMETHING"), Some("READY")], &calls),
            )
            .await
            .unwrap();

        assert_eq!(result, Some("READY"));
    }

    #[tokio::test(start_paused = true)]
    async fn absence_during_create_exhausts_budget() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], Duration::from_secs(600))
            .not_found_checks(3);

        let err = conf
            .wait_for_state(&Context::new(), scripted(vec![None], &calls))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::NotFound { retries: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn read_after_write_gap_is_tolerated() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], Duration::from_secs(600))
            .not_found_checks(2);

        let result = conf
            .wait_for_state(
                &Context::new(),
                scripted(
                    vec![None, None, Some("CREATING"), None, None, Some("READY")],
                    &calls,
                ),
            )
            .await
            .unwrap();

        assert_eq!(result, Some("READY"));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_errors_are_fatal() {
        let calls = Mutex::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], Duration::from_secs(60));

        let err = conf
            .wait_for_state(&Context::new(), || {
                *calls.lock().unwrap() += 1;
                std::future::ready(Err::<PollOutcome<()>, _>(Boom))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Refresh(Boom)));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_poll_interval_is_honoured() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], Duration::from_secs(35))
            .poll_interval(Duration::from_secs(10));

        let _ = conf
            .wait_for_state(&Context::new(), scripted(vec![Some("CREATING")], &calls))
            .await;

        // polls at 0s, 10s, 20s and 30s
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn long_pending_wait_backs_off_without_overflow() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], crate::timeouts::DEFAULT_TIMEOUT);
        let start = Instant::now();

        let err = conf
            .wait_for_state(&Context::new(), scripted(vec![Some("CREATING")], &calls))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Timeout { .. }));
        assert_eq!(start.elapsed(), crate::timeouts::DEFAULT_TIMEOUT);
        // backoff settles at 10s between polls
        assert!(calls.load(Ordering::SeqCst) > 170);
    }

    #[tokio::test(start_paused = true)]
    async fn min_timeout_above_backoff_cap_is_a_floor() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], Duration::from_secs(95))
            .min_timeout(Duration::from_secs(30));

        let _ = conf
            .wait_for_state(&Context::new(), scripted(vec![Some("CREATING")], &calls))
            .await;

        // polls at 0s, 30s, 60s and 90s
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_timeout_falls_back_to_context_deadline() {
        let calls = AtomicUsize::new(0);
        let conf = StateChangeConf::new(&["CREATING"], &["READY"], Duration::MAX)
            .delay(Duration::MAX);
        let ctx = Context::new().with_timeout(Duration::from_secs(60));
        let start = Instant::now();

        let err = conf
            .wait_for_state(&ctx, scripted(vec![Some("CREATING")], &calls))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Timeout { .. }));
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[test]
    fn not_found_errors_become_gone() {
        let outcome = PollOutcome::<()>::from_result(
            Err(ApiError::NotFound {
                message: "missing".to_string(),
            }),
            |_| String::new(),
        )
        .unwrap();
        assert_eq!(outcome, PollOutcome::Gone);

        let err = PollOutcome::<()>::from_result(
            Err(ApiError::AccessDenied {
                message: "no".to_string(),
            }),
            |_| String::new(),
        );
        assert!(err.is_err());
    }
}
