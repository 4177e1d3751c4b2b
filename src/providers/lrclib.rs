//! LRCLIB client
//!
//! LRCLIB is a free lyrics API that serves LRC-format synced lyrics.
//! API Documentation: https://lrclib.net/docs

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info};

use super::{not_found_as_none, LyricsProvider};
use crate::lyrics::parse_lrc;
use crate::matching::{select_best, LRCLIB_WEIGHTS};
use crate::models::{LyricResult, MatchCandidate, TrackQuery};
use crate::reliability::{HttpRequest, RetryExecutor};

pub const DEFAULT_BASE_URL: &str = "https://lrclib.net/api";

#[derive(Debug, Clone, Deserialize)]
pub struct LrclibTrack {
    pub id: u64,
    #[serde(rename = "trackName", default)]
    pub track_name: String,
    #[serde(rename = "artistName", default)]
    pub artist_name: String,
    #[serde(rename = "albumName")]
    pub album_name: Option<String>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(rename = "plainLyrics")]
    pub plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    pub synced_lyrics: Option<String>,
}

impl LrclibTrack {
    pub fn has_synced_lyrics(&self) -> bool {
        !self.instrumental
            && self
                .synced_lyrics
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty())
    }

    fn to_candidate(&self) -> MatchCandidate {
        MatchCandidate::new(
            self.id.to_string(),
            self.track_name.clone(),
            vec![self.artist_name.clone()],
        )
        .with_album(self.album_name.clone())
        .with_duration(self.duration)
    }

    /// Plain-only rows produce `None`; this application only shows synced lyrics.
    fn to_result(&self) -> Option<LyricResult> {
        if self.instrumental {
            return Some(LyricResult::instrumental());
        }
        if !self.has_synced_lyrics() {
            return None;
        }
        self.synced_lyrics
            .as_deref()
            .and_then(parse_lrc)
            .and_then(LyricResult::synced)
    }
}

pub struct LrclibProvider {
    http: RetryExecutor,
    base_url: String,
}

impl LrclibProvider {
    pub fn new(http: RetryExecutor, base_url: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Exact lookup by track signature
    fn get_exact(&self, query: &TrackQuery) -> Result<Option<LrclibTrack>> {
        let mut request = HttpRequest::get(format!("{}/get", self.base_url))
            .query("track_name", &query.title)
            .query("artist_name", &query.artist);

        if let Some(album) = &query.album {
            request = request.query("album_name", album);
        }
        if let Some(duration) = query.duration_rounded() {
            request = request.query("duration", duration);
        }

        Ok(not_found_as_none(self.http.execute_json(&request))?)
    }

    fn search(&self, query: &TrackQuery) -> Result<Vec<LrclibTrack>> {
        let request = HttpRequest::get(format!("{}/search", self.base_url))
            .query("track_name", &query.title)
            .query("artist_name", &query.artist);

        Ok(not_found_as_none(self.http.execute_json(&request))?.unwrap_or_default())
    }

    /// Best search row that can actually produce a result.
    fn best_match(results: &[LrclibTrack], query: &TrackQuery) -> Option<LyricResult> {
        let usable: Vec<&LrclibTrack> = results
            .iter()
            .filter(|r| r.instrumental || r.has_synced_lyrics())
            .collect();
        let candidates: Vec<MatchCandidate> = usable.iter().map(|r| r.to_candidate()).collect();

        let (best, score) = select_best(&candidates, query, &LRCLIB_WEIGHTS);
        let Some(best) = best else {
            debug!(provider = "lrclib", score, rows = results.len(), "no confident search match");
            return None;
        };

        usable
            .iter()
            .find(|r| r.id.to_string() == best.id)
            .and_then(|r| r.to_result())
    }
}

impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    fn get_lyrics(&mut self, query: &TrackQuery) -> Result<Option<LyricResult>> {
        // First try the "get" endpoint with an exact match
        if let Some(track) = self.get_exact(query)? {
            if let Some(result) = track.to_result() {
                info!(provider = "lrclib", id = track.id, "exact match");
                return Ok(Some(result));
            }
            debug!(provider = "lrclib", id = track.id, "exact match has no synced lyrics");
        }

        // Fall back to search
        let results = self.search(query)?;
        Ok(Self::best_match(&results, query))
    }
}
