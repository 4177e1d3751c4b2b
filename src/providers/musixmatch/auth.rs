use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::reliability::{FetchError, HttpRequest, RetryExecutor, Token, TokenManager};

pub const APP_ID: &str = "web-desktop-app-v1.0";

/// Session tokens for the desktop API.
pub struct MusixmatchAuth {
    http: RetryExecutor,
    base_url: String,
    ttl: Duration,
    tokens: TokenManager,
}

impl MusixmatchAuth {
    pub fn new(
        http: RetryExecutor,
        base_url: String,
        ttl: Duration,
        fallback_token: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url,
            ttl,
            tokens: TokenManager::new(fallback_token),
        }
    }

    pub fn get_token(&mut self) -> Option<String> {
        let (http, base_url, ttl) = (&self.http, &self.base_url, self.ttl);
        let now = self.tokens.now();
        self.tokens
            .get_token(|| request_new_token(http, base_url, ttl, now))
    }

    /// The server rejected the current token.
    pub fn refresh(&mut self) -> Option<String> {
        let (http, base_url, ttl) = (&self.http, &self.base_url, self.ttl);
        let now = self.tokens.now();
        self.tokens
            .refresh(|| request_new_token(http, base_url, ttl, now))
    }

    pub fn mark_accepted(&mut self) {
        self.tokens.mark_accepted();
    }
}

fn request_new_token(
    http: &RetryExecutor,
    base_url: &str,
    ttl: Duration,
    now: f64,
) -> Result<Token, FetchError> {
    let request = HttpRequest::get(format!("{base_url}/token.get"))
        .query("app_id", APP_ID)
        .query("user_language", "en")
        .query("format", "json");

    let data: Value = http.execute_json(&request)?;

    let status = data
        .pointer("/message/header/status_code")
        .and_then(Value::as_i64)
        .unwrap_or(200);
    if status != 200 {
        let hint = data
            .pointer("/message/header/hint")
            .and_then(Value::as_str)
            .unwrap_or_default();
        warn!(provider = "musixmatch", status, hint, "token request refused");
        return Err(if hint == "captcha" {
            FetchError::Blocked("captcha on token.get".to_string())
        } else {
            FetchError::Status(status as u16)
        });
    }

    let value = data
        .pointer("/message/body/user_token")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if value.is_empty() {
        return Err(FetchError::Parse("token.get returned no user_token".to_string()));
    }
    // Placeholder token handed out to clients the API has throttled
    if value.contains("UpgradeOnly") {
        return Err(FetchError::Blocked("upgrade-only token".to_string()));
    }

    Ok(Token {
        value: value.to_string(),
        expires_at: now + ttl.as_secs_f64(),
    })
}
