//! Retrying a single page request.
//!
//! The policy wraps one page fetch at a time, so an exhausted page fails
//! the aggregation it belongs to instead of restarting it.

use std::{fmt, sync::Arc, time::Duration};

use tracing::warn;

use crate::api::error::{FetchError, PageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The n-th retry waits `n * step`.
    Linear(Duration),
}

impl Backoff {
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Linear(step) => step.saturating_mul(retry),
        }
    }
}

type Retryable = Arc<dyn Fn(&PageError) -> bool + Send + Sync>;
type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Backoff,
    retryable: Retryable,
    sleeper: Sleeper,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(3, Backoff::Linear(Duration::from_secs(1)))
    }
}

impl RetryPolicy {
    /// Retries transient failures only, sleeping on the current thread.
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        RetryPolicy {
            max_retries,
            backoff,
            retryable: Arc::new(PageError::is_transient),
            sleeper: Arc::new(std::thread::sleep),
        }
    }

    /// A policy that gives up on the first failure.
    pub fn never() -> Self {
        RetryPolicy::new(0, Backoff::Linear(Duration::from_secs(0)))
    }

    /// Replaces the retryable predicate. Malformed responses are never retried regardless.
    pub fn with_retryable(mut self, retryable: impl Fn(&PageError) -> bool + Send + Sync + 'static) -> Self {
        self.retryable = Arc::new(retryable);
        self
    }

    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }

    /// Runs `attempt` until it succeeds, fails for good or the retry bound is hit.
    pub fn call<T, F>(&self, what: &str, mut attempt: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Result<T, PageError>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let error = match attempt() {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            let retries = attempts - 1;
            let give_up = matches!(error, PageError::MalformedResponse(_))
                || retries >= self.max_retries
                || !(self.retryable)(&error);
            if give_up {
                return Err(FetchError::from_page(error, attempts));
            }
            let delay = self.delay(attempts);
            warn!(
                request = what,
                retry = attempts,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                %error,
                "retrying page request"
            );
            (self.sleeper)(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Backoff, RetryPolicy};
    use crate::api::error::{FetchError, PageError};
    use std::{
        cell::RefCell,
        collections::VecDeque,
        sync::{Arc, Mutex},
        time::Duration,
    };

    fn recording_policy(max_retries: u32) -> (RetryPolicy, Arc<Mutex<Vec<Duration>>>) {
        let slept = Arc::new(Mutex::new(Vec::new()));
        let log = slept.clone();
        let policy = RetryPolicy::new(max_retries, Backoff::Linear(Duration::from_secs(1)))
            .with_sleeper(move |delay| log.lock().unwrap().push(delay));
        (policy, slept)
    }

    fn scripted(results: Vec<Result<u32, PageError>>) -> (RefCell<VecDeque<Result<u32, PageError>>>, RefCell<u32>) {
        (RefCell::new(results.into()), RefCell::new(0))
    }

    fn unavailable() -> PageError {
        PageError::TransientServerStatus { status: 503, message: "unavailable".into() }
    }

    #[test]
    fn first_success_is_returned_without_sleeping() {
        let (policy, slept) = recording_policy(3);
        assert_eq!(policy.call("page", || Ok::<_, PageError>(7)), Ok(7));
        assert!(slept.lock().unwrap().is_empty());
    }

    #[test]
    fn transient_failures_back_off_linearly() {
        let (policy, slept) = recording_policy(3);
        let (script, calls) = scripted(vec![
            Err(PageError::TransientNetwork("refused".into())),
            Err(unavailable()),
            Ok(1),
        ]);
        let result = policy.call("page", || {
            *calls.borrow_mut() += 1;
            script.borrow_mut().pop_front().unwrap()
        });
        assert_eq!(result, Ok(1));
        assert_eq!(*calls.borrow(), 3);
        assert_eq!(*slept.lock().unwrap(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn retries_are_bounded() {
        let (policy, slept) = recording_policy(3);
        let mut calls = 0;
        let result: Result<(), _> = policy.call("page", || {
            calls += 1;
            Err(unavailable())
        });
        assert_eq!(calls, 4);
        assert_eq!(slept.lock().unwrap().len(), 3);
        assert_eq!(
            result,
            Err(FetchError::FetchFailed { status: Some(503), message: "unavailable".into(), attempts: 4 })
        );
    }

    #[test]
    fn non_transient_status_is_not_retried() {
        let (policy, slept) = recording_policy(3);
        let mut calls = 0;
        let result: Result<(), _> = policy.call("page", || {
            calls += 1;
            Err(PageError::Status { status: 404, message: "no such experiment".into() })
        });
        assert_eq!(calls, 1);
        assert!(slept.lock().unwrap().is_empty());
        assert_eq!(result.unwrap_err().status(), Some(404));
    }

    #[test]
    fn malformed_is_never_retried() {
        let (policy, _) = recording_policy(3);
        let policy = policy.with_retryable(|_| true);
        let mut calls = 0;
        let result: Result<(), _> = policy.call("page", || {
            calls += 1;
            Err(PageError::MalformedResponse("missing runs".into()))
        });
        assert_eq!(calls, 1);
        assert_eq!(result, Err(FetchError::MalformedResponse("missing runs".into())));
    }

    #[test]
    fn custom_predicate_narrows_retries() {
        let (policy, _) = recording_policy(3);
        let policy = policy.with_retryable(|error| matches!(error, PageError::TransientNetwork(_)));
        let mut calls = 0;
        let result: Result<(), _> = policy.call("page", || {
            calls += 1;
            Err(unavailable())
        });
        assert_eq!(calls, 1);
        assert!(result.is_err());
    }

    #[test]
    fn never_policy_makes_one_attempt() {
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::never().call("page", || {
            calls += 1;
            Err(PageError::TransientNetwork("down".into()))
        });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(FetchError::FetchFailed { attempts: 1, .. })));
    }
}
