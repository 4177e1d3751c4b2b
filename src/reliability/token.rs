use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::FetchError;

/// Seconds of remaining validity below which a cached token is refreshed.
const REFRESH_MARGIN_SECS: f64 = 60.0;
const MAX_REFRESH_ATTEMPTS: u32 = 3;

pub type Clock = Arc<dyn Fn() -> f64 + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: String,
    pub expires_at: f64,
}

pub fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// In-memory session token with lazy refresh.
///
/// When a fetch fails, or the source keeps rejecting fresh tokens, the
/// configured fallback credential is handed out instead so the owning
/// provider stays usable.
pub struct TokenManager {
    cached: Option<Token>,
    fallback: Option<String>,
    refresh_attempts: u32,
    clock: Clock,
}

impl TokenManager {
    pub fn new(fallback: Option<String>) -> Self {
        Self {
            cached: None,
            fallback: fallback.filter(|f| !f.is_empty()),
            refresh_attempts: 0,
            clock: Arc::new(epoch_secs),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> f64 {
        (self.clock)()
    }

    /// The cached token while it has more than a minute left, otherwise a
    /// freshly fetched one, otherwise the fallback.
    pub fn get_token<F>(&mut self, fetch: F) -> Option<String>
    where
        F: FnOnce() -> Result<Token, FetchError>,
    {
        let now = self.now();
        if let Some(ref cached) = self.cached {
            if now < cached.expires_at - REFRESH_MARGIN_SECS {
                return Some(cached.value.clone());
            }
        }

        match fetch() {
            Ok(token) => {
                debug!(expires_in = token.expires_at - now, "fetched new token");
                let value = token.value.clone();
                self.cached = Some(token);
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, "token fetch failed, using fallback token");
                self.cached = None;
                self.fallback.clone()
            }
        }
    }

    /// Drop the cached token after the source rejected it and fetch another.
    /// Repeated rejections switch to the fallback and reset the counter.
    pub fn refresh<F>(&mut self, fetch: F) -> Option<String>
    where
        F: FnOnce() -> Result<Token, FetchError>,
    {
        self.cached = None;
        self.refresh_attempts += 1;

        if self.refresh_attempts > MAX_REFRESH_ATTEMPTS {
            warn!(
                attempts = self.refresh_attempts - 1,
                "token keeps expiring, using fallback token"
            );
            self.refresh_attempts = 0;
            return self.fallback.clone();
        }

        self.get_token(fetch)
    }

    /// The source accepted the current token.
    pub fn mark_accepted(&mut self) {
        self.refresh_attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Mutex;

    fn manual_clock(start: f64) -> (Arc<Mutex<f64>>, Clock) {
        let now = Arc::new(Mutex::new(start));
        let handle = Arc::clone(&now);
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (now, clock)
    }

    fn token(value: &str, expires_at: f64) -> Token {
        Token {
            value: value.to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_token_reused_until_margin() {
        let (now, clock) = manual_clock(1_000.0);
        let mut tokens = TokenManager::new(None).with_clock(clock);
        let fetches = Cell::new(0);
        let expiry = 1_600.0;

        let get = |tokens: &mut TokenManager| {
            tokens.get_token(|| {
                fetches.set(fetches.get() + 1);
                Ok(token(&format!("t{}", fetches.get()), expiry))
            })
        };

        assert_eq!(get(&mut tokens), Some("t1".to_string()));
        *now.lock().unwrap() = expiry - 61.0;
        assert_eq!(get(&mut tokens), Some("t1".to_string()));
        assert_eq!(fetches.get(), 1);

        *now.lock().unwrap() = expiry - 30.0;
        assert_eq!(get(&mut tokens), Some("t2".to_string()));
        assert_eq!(fetches.get(), 2);
    }

    #[test]
    fn test_refresh_at_exact_margin() {
        let (now, clock) = manual_clock(0.0);
        let mut tokens = TokenManager::new(None).with_clock(clock);
        tokens.get_token(|| Ok(token("old", 100.0)));

        *now.lock().unwrap() = 40.0;
        assert_eq!(
            tokens.get_token(|| Ok(token("new", 1_000.0))),
            Some("new".to_string())
        );
    }

    #[test]
    fn test_failed_fetch_uses_fallback() {
        let mut tokens = TokenManager::new(Some("community".to_string()));
        let value = tokens.get_token(|| Err(FetchError::Transport("down".to_string())));
        assert_eq!(value, Some("community".to_string()));

        let mut no_fallback = TokenManager::new(None);
        assert_eq!(
            no_fallback.get_token(|| Err(FetchError::Status(500))),
            None
        );
    }

    #[test]
    fn test_refresh_bounded_then_fallback() {
        let mut tokens = TokenManager::new(Some("fallback".to_string()));
        let fetches = Cell::new(0);
        let fetch = || -> Result<Token, FetchError> {
            fetches.set(fetches.get() + 1);
            Ok(token("fresh", epoch_secs() + 600.0))
        };

        for _ in 0..MAX_REFRESH_ATTEMPTS {
            assert_eq!(tokens.refresh(fetch), Some("fresh".to_string()));
        }
        assert_eq!(tokens.refresh(fetch), Some("fallback".to_string()));
        assert_eq!(fetches.get(), MAX_REFRESH_ATTEMPTS);

        // Counter was reset
        assert_eq!(tokens.refresh(fetch), Some("fresh".to_string()));
    }

    #[test]
    fn test_accepted_token_resets_refresh_counter() {
        let mut tokens = TokenManager::new(Some("fallback".to_string()));
        let fetch = || -> Result<Token, FetchError> { Ok(token("fresh", epoch_secs() + 600.0)) };
        for _ in 0..10 {
            assert_eq!(tokens.refresh(fetch), Some("fresh".to_string()));
            tokens.mark_accepted();
        }
    }
}
