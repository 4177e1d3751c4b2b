//! Spotify lyrics through a self-hosted proxy
//!
//! Track ids come from the public Web API (client-credentials auth); the
//! lyrics themselves come from a proxy that fronts Spotify's internal
//! color-lyrics endpoint.

mod api;
mod auth;

use self::api::SpotifyApi;
use self::auth::SpotifyAuth;
use crate::matching::{select_best, SPOTIFY_WEIGHTS};
use crate::models::{LyricResult, MatchCandidate, TrackQuery};
use crate::providers::LyricsProvider;
use crate::reliability::{FetchError, RetryExecutor};
use anyhow::Result;
use tracing::{debug, info, warn};

pub use self::api::API_BASE_URL;

pub struct SpotifyProvider {
    api: SpotifyApi,
    auth: SpotifyAuth,
}

impl SpotifyProvider {
    pub fn new(
        http: RetryExecutor,
        client_id: String,
        client_secret: String,
        proxy_url: String,
        base_url: Option<String>,
    ) -> Self {
        let base_url = base_url.unwrap_or_else(|| API_BASE_URL.to_string());
        Self {
            api: SpotifyApi::new(http.clone(), base_url, proxy_url),
            auth: SpotifyAuth::new(http, client_id, client_secret),
        }
    }

    /// Search with one token refresh on a 401/403.
    fn search(&mut self, query: &TrackQuery) -> Result<Option<Vec<MatchCandidate>>, FetchError> {
        let Some(token) = self.auth.get_access_token() else {
            warn!(provider = "spotify", "no access token");
            return Ok(None);
        };

        match self.api.search_tracks(query, &token) {
            Ok(candidates) => {
                self.auth.mark_accepted();
                return Ok(Some(candidates));
            }
            Err(e) if e.is_unauthorized() => {}
            Err(e) => return Err(e),
        }

        info!(provider = "spotify", "access token rejected, refreshing");
        let Some(token) = self.auth.refresh() else {
            return Ok(None);
        };
        let candidates = self.api.search_tracks(query, &token)?;
        self.auth.mark_accepted();
        Ok(Some(candidates))
    }
}

impl LyricsProvider for SpotifyProvider {
    fn name(&self) -> &'static str {
        "spotify"
    }

    fn get_lyrics(&mut self, query: &TrackQuery) -> Result<Option<LyricResult>> {
        let Some(candidates) = self.search(query)? else {
            return Ok(None);
        };

        let (best, score) = select_best(&candidates, query, &SPOTIFY_WEIGHTS);
        let Some(best) = best else {
            debug!(provider = "spotify", score, rows = candidates.len(), "no confident match");
            return Ok(None);
        };
        info!(provider = "spotify", id = %best.id, score, "matched track");

        match self.api.fetch_lyrics(&best.id) {
            Ok(lines) => Ok(lines.and_then(LyricResult::synced)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
