//! Musixmatch desktop API
//!
//! One `macro.subtitles.get` call per lookup returns both the matched track
//! and its line-synced subtitles. Word timing comes from `track.richsync.get`
//! when the track advertises it.

mod api;
mod auth;

use self::api::{Lookup, MusixmatchApi, MxmTrack};
use self::auth::MusixmatchAuth;
use crate::lyrics::parse_subtitles;
use crate::matching::{score, MUSIXMATCH_WEIGHTS};
use crate::models::{LyricResult, TrackQuery};
use crate::providers::LyricsProvider;
use crate::reliability::{FetchError, RateLimiter, RetryExecutor};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use self::api::DEFAULT_BASE_URL;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(600);

pub struct MusixmatchProvider {
    api: MusixmatchApi,
    auth: MusixmatchAuth,
}

impl MusixmatchProvider {
    /// `limiter` spaces out every call to the source: token, lookup and richsync.
    pub fn new(
        http: RetryExecutor,
        limiter: Option<Arc<RateLimiter>>,
        base_url: Option<String>,
        fallback_token: Option<String>,
        token_ttl: Duration,
    ) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = http.with_rate_limiter(limiter);
        Self {
            api: MusixmatchApi::new(http.clone(), base_url.clone()),
            auth: MusixmatchAuth::new(http, base_url, token_ttl, fallback_token),
        }
    }

    /// Lookup with exactly one token renewal on an expiry signal.
    fn lookup(&mut self, query: &TrackQuery) -> Result<Option<(Lookup, String)>, FetchError> {
        let Some(token) = self.auth.get_token() else {
            warn!(provider = "musixmatch", "no usable token");
            return Ok(None);
        };

        match self.api.lookup(query, &token)? {
            Lookup::TokenExpired => {}
            lookup => {
                self.auth.mark_accepted();
                return Ok(Some((lookup, token)));
            }
        }

        info!(provider = "musixmatch", "token rejected, renewing");
        let Some(token) = self.auth.refresh() else {
            return Ok(None);
        };
        match self.api.lookup(query, &token)? {
            Lookup::TokenExpired => {
                warn!(provider = "musixmatch", "renewed token rejected as well");
                Ok(None)
            }
            lookup => {
                self.auth.mark_accepted();
                Ok(Some((lookup, token)))
            }
        }
    }

    fn build_result(
        &self,
        track: &MxmTrack,
        subtitle_body: Option<&str>,
        token: &str,
    ) -> Option<LyricResult> {
        if track.is_instrumental() {
            return Some(LyricResult::instrumental());
        }
        if track.has_subtitles == 0 {
            debug!(provider = "musixmatch", track_id = track.track_id, "track has no subtitles");
        }

        let lines = subtitle_body.and_then(parse_subtitles)?;
        let result = LyricResult::synced(lines)?;

        if !track.has_richsync() {
            return Some(result);
        }
        let words = match self.api.richsync(track.track_id, token) {
            Ok(words) => words,
            Err(e) => {
                warn!(provider = "musixmatch", track_id = track.track_id, error = %e, "richsync unavailable");
                None
            }
        };
        Some(result.with_word_synced(words))
    }
}

impl LyricsProvider for MusixmatchProvider {
    fn name(&self) -> &'static str {
        "musixmatch"
    }

    fn get_lyrics(&mut self, query: &TrackQuery) -> Result<Option<LyricResult>> {
        let (lookup, token) = match self.lookup(query) {
            Ok(Some(found)) => found,
            Ok(None) => return Ok(None),
            Err(FetchError::Blocked(reason)) => {
                warn!(provider = "musixmatch", %reason, "blocked by source");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let Lookup::Found {
            track,
            subtitle_body,
        } = lookup
        else {
            debug!(provider = "musixmatch", "no matching track");
            return Ok(None);
        };

        let confidence = score(&track.to_candidate(), query, &MUSIXMATCH_WEIGHTS);
        if confidence < MUSIXMATCH_WEIGHTS.threshold {
            debug!(
                provider = "musixmatch",
                track_id = track.track_id,
                score = confidence,
                "matcher result rejected"
            );
            return Ok(None);
        }
        info!(provider = "musixmatch", track_id = track.track_id, score = confidence, "matched track");

        Ok(self.build_result(&track, subtitle_body.as_deref(), &token))
    }
}
