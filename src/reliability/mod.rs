//! HTTP plumbing shared by every network-backed provider:
//! a transport seam, bounded retries, per-source rate limiting and a
//! token cache.

pub mod rate_limit;
pub mod retry;
pub mod token;

use anyhow::{Context, Result};
use std::time::Duration;
use thiserror::Error;

pub use rate_limit::{RateLimiter, RateLimiters};
pub use retry::{RetryExecutor, RetryPolicy};
pub use token::{Token, TokenManager};

const USER_AGENT: &str = "synclyrics/0.1.0 (https://github.com/estevaom/synclyrics)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub json: Option<serde_json::Value>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            form: None,
            json: None,
            timeout: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn form(mut self, params: &[(&str, &str)]) -> Self {
        self.form = Some(
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// URL with the encoded query string appended, as it goes on the wire.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, seconds form only
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connection, TLS or timeout failure below the HTTP layer.
#[derive(Debug, Clone, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Failure taxonomy seen by providers once retries are spent.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("transport failed after retries: {0}")]
    Transport(String),
    #[error("rate limited after retries")]
    RateLimited,
    #[error("blocked by source: {0}")]
    Blocked(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("unparseable response body: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status(404))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Status(401) | FetchError::Status(403))
    }
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url_encodes_query() {
        let request = HttpRequest::get("https://lrclib.net/api/get")
            .query("artist_name", "Simon & Garfunkel")
            .query("track_name", "The Boxer");
        assert_eq!(
            request.full_url(),
            "https://lrclib.net/api/get?artist_name=Simon%20%26%20Garfunkel&track_name=The%20Boxer"
        );
    }

    #[test]
    fn test_full_url_appends_to_existing_query() {
        let request = HttpRequest::get("https://example.com/x?a=1").query("b", 2);
        assert_eq!(request.full_url(), "https://example.com/x?a=1&b=2");
    }

    #[test]
    fn test_bearer_auth_header() {
        let request = HttpRequest::get("https://example.com").bearer_auth("abc");
        assert_eq!(
            request.headers,
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
    }

    #[test]
    fn test_fetch_error_classification() {
        assert!(FetchError::Status(404).is_not_found());
        assert!(FetchError::Status(401).is_unauthorized());
        assert!(!FetchError::RateLimited.is_unauthorized());
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }
}
