use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use retry_policies::policies::ExponentialBackoff;
use retry_policies::{Jitter, RetryDecision, RetryPolicy as _};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{FetchError, HttpRequest, HttpResponse, RateLimiter, Transport};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Ceiling for both backoff and `Retry-After` waits
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Base 2, no jitter, bounded by `base_delay..=max_delay`.
    fn exponential(&self) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .retry_bounds(self.base_delay.min(self.max_delay), self.max_delay)
            .base(2)
            .jitter(Jitter::None)
            .build_with_max_retries(self.max_attempts.saturating_sub(1))
    }

    /// 1x, 2x, 4x ... of the base delay for attempts 1, 2, 3 ..., capped.
    /// `None` once the attempt budget is spent.
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        let started = SystemTime::now();
        match self.exponential().should_retry(started, attempt.saturating_sub(1)) {
            RetryDecision::Retry { execute_after } => Some(
                execute_after
                    .duration_since(started)
                    .unwrap_or_default()
                    .min(self.max_delay),
            ),
            RetryDecision::DoNotRetry => None,
        }
    }
}

enum Outcome {
    Done(Result<HttpResponse, FetchError>),
    /// `retry_after` overrides the backoff for this attempt, capped.
    Retry {
        error: FetchError,
        retry_after: Option<Duration>,
    },
}

/// Runs requests against one source with bounded retries and optional
/// rate limiting. Cheap to clone; clones share the transport and limiter.
#[derive(Clone)]
pub struct RetryExecutor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    limiter: Option<Arc<RateLimiter>>,
}

impl RetryExecutor {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Option<Arc<RateLimiter>>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Send `request` until it succeeds, fails terminally or attempts run out.
    /// Only 2xx responses come back as `Ok`.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut request = request.clone();
        if request.timeout.is_none() {
            request.timeout = Some(self.policy.timeout);
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = FetchError::Transport("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            if let Some(limiter) = &self.limiter {
                limiter.wait();
            }

            match self.attempt(&request) {
                Outcome::Done(result) => return result,
                Outcome::Retry { error, retry_after } => {
                    let Some(backoff) = self.policy.backoff(attempt) else {
                        last_error = error;
                        break;
                    };
                    let delay = retry_after
                        .map(|d| d.min(self.policy.max_delay))
                        .unwrap_or(backoff);
                    debug!(
                        url = %request.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying request"
                    );
                    thread::sleep(delay);
                    last_error = error;
                }
            }
        }

        warn!(url = %request.url, attempts = max_attempts, error = %last_error, "giving up on request");
        Err(last_error)
    }

    fn attempt(&self, request: &HttpRequest) -> Outcome {
        let response = match self.transport.execute(request) {
            Ok(response) => response,
            Err(e) => {
                return Outcome::Retry {
                    error: FetchError::Transport(e.0),
                    retry_after: None,
                }
            }
        };

        match response.status {
            200..=299 => Outcome::Done(Ok(response)),
            429 => Outcome::Retry {
                error: FetchError::RateLimited,
                retry_after: response.retry_after,
            },
            500..=599 => Outcome::Retry {
                error: FetchError::Status(response.status),
                retry_after: None,
            },
            status => Outcome::Done(Err(FetchError::Status(status))),
        }
    }

    /// `execute` plus JSON decoding. A bad body is not retried.
    pub fn execute_json<T: DeserializeOwned>(&self, request: &HttpRequest) -> Result<T, FetchError> {
        let response = self.execute(request)?;
        serde_json::from_str(&response.body).map_err(|e| {
            debug!(url = %request.url, error = %e, "response body did not parse");
            FetchError::Parse(e.to_string())
        })
    }
}
