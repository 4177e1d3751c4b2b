use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota};
use tracing::debug;

/// Minimum spacing between requests to one source.
///
/// A GCRA limiter with a burst of one, shared through `Arc` by everything
/// that talks to the source, so the spacing holds across provider instances
/// and threads. A zero interval never waits.
pub struct RateLimiter {
    source: String,
    min_interval: Duration,
    limiter: Option<DefaultDirectRateLimiter>,
    clock: DefaultClock,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("source", &self.source)
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(source: impl Into<String>, min_interval: Duration) -> Self {
        let limiter = Quota::with_period(min_interval)
            .map(|quota| DefaultDirectRateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));
        Self {
            source: source.into(),
            min_interval,
            limiter,
            clock: DefaultClock::default(),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until this caller may dispatch its request.
    pub fn wait(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        while let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            debug!(
                source = %self.source,
                wait_ms = wait.as_millis() as u64,
                "waiting for rate limit"
            );
            thread::sleep(wait);
        }
    }
}

/// One limiter per rate-sensitive source, handed to every resolver that
/// should share the same request budget.
#[derive(Debug, Default, Clone)]
pub struct RateLimiters {
    limiters: Arc<Mutex<HashMap<String, Arc<RateLimiter>>>>,
}

impl RateLimiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared limiter for `source`, created on first use.
    /// A zero interval means the source is not rate limited.
    pub fn for_source(&self, source: &str, min_interval: Duration) -> Option<Arc<RateLimiter>> {
        if min_interval.is_zero() {
            return None;
        }
        let mut limiters = self
            .limiters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let limiter = limiters
            .entry(source.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::new(source, min_interval)));
        Some(Arc::clone(limiter))
    }
}
