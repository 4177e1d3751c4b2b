use serde::Deserialize;

use crate::reliability::{FetchError, HttpRequest, RetryExecutor, Token, TokenManager};

pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[allow(dead_code)]
    pub token_type: String,
    pub expires_in: u64,
}

/// Client-credentials access token for the Web API.
pub struct SpotifyAuth {
    http: RetryExecutor,
    client_id: String,
    client_secret: String,
    tokens: TokenManager,
}

impl SpotifyAuth {
    pub fn new(http: RetryExecutor, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            // No shared credential exists for this API
            tokens: TokenManager::new(None),
        }
    }

    pub fn get_access_token(&mut self) -> Option<String> {
        let now = self.tokens.now();
        let (http, id, secret) = (&self.http, &self.client_id, &self.client_secret);
        self.tokens
            .get_token(|| request_new_token(http, id, secret, now))
    }

    pub fn refresh(&mut self) -> Option<String> {
        let now = self.tokens.now();
        let (http, id, secret) = (&self.http, &self.client_id, &self.client_secret);
        self.tokens
            .refresh(|| request_new_token(http, id, secret, now))
    }

    pub fn mark_accepted(&mut self) {
        self.tokens.mark_accepted();
    }
}

fn request_new_token(
    http: &RetryExecutor,
    client_id: &str,
    client_secret: &str,
    now: f64,
) -> Result<Token, FetchError> {
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", client_id),
        ("client_secret", client_secret),
    ];
    let request = HttpRequest::post(TOKEN_URL).form(&params);

    let response: TokenResponse = http.execute_json(&request)?;
    Ok(Token {
        value: response.access_token,
        expires_at: now + response.expires_in as f64,
    })
}
