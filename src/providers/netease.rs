//! NetEase Cloud Music
//!
//! Search rows are scored locally; line lyrics come from `/api/song/lyric`
//! and word timing (YRC) from the newer `/api/song/lyric/v1` endpoint.

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{artist_names, value_as_f64, value_as_string, LyricsProvider};
use crate::lyrics::{parse_lrc, parse_yrc};
use crate::matching::{select_best, NETEASE_WEIGHTS};
use crate::models::{LyricResult, MatchCandidate, SyncedLine, TrackQuery};
use crate::reliability::{FetchError, HttpRequest, RetryExecutor};

pub const DEFAULT_BASE_URL: &str = "https://music.163.com";
const REFERER: &str = "https://music.163.com/";
const SEARCH_LIMIT: u32 = 10;

/// Response codes NetEase uses to reject a client outright.
const BLOCK_CODES: [i64; 2] = [-460, 405];

pub struct NeteaseProvider {
    http: RetryExecutor,
    base_url: String,
}

impl NeteaseProvider {
    pub fn new(http: RetryExecutor, base_url: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn request(&self, path: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{path}", self.base_url)).header("Referer", REFERER)
    }

    fn search(&self, query: &TrackQuery) -> Result<Vec<MatchCandidate>, FetchError> {
        let request = self
            .request("/api/search/get/web")
            .query("s", format!("{} {}", query.title, query.artist))
            .query("type", 1)
            .query("offset", 0)
            .query("limit", SEARCH_LIMIT);

        let data: Value = self.http.execute_json(&request)?;
        check_code(&data)?;

        let songs = data
            .pointer("/result/songs")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(songs.iter().filter_map(song_to_candidate).collect())
    }

    fn fetch_lrc(&self, song_id: &str) -> Result<Value, FetchError> {
        let request = self
            .request("/api/song/lyric")
            .query("id", song_id)
            .query("lv", -1)
            .query("kv", -1)
            .query("tv", -1);

        let data: Value = self.http.execute_json(&request)?;
        check_code(&data)?;
        Ok(data)
    }

    /// Word-level lyrics. Any failure here only costs the word timing.
    fn fetch_yrc(&self, song_id: &str) -> Option<Vec<SyncedLine>> {
        let request = self
            .request("/api/song/lyric/v1")
            .query("id", song_id)
            .query("lv", -1)
            .query("yv", 1);

        match self.http.execute_json::<Value>(&request) {
            Ok(data) => data
                .pointer("/yrc/lyric")
                .and_then(Value::as_str)
                .and_then(parse_yrc),
            Err(e) => {
                warn!(provider = "netease", song_id, error = %e, "word-level lyrics unavailable");
                None
            }
        }
    }
}

fn check_code(data: &Value) -> Result<(), FetchError> {
    match data.get("code").and_then(Value::as_i64) {
        Some(code) if BLOCK_CODES.contains(&code) => {
            Err(FetchError::Blocked(format!("netease code {code}")))
        }
        _ => Ok(()),
    }
}

fn song_to_candidate(song: &Value) -> Option<MatchCandidate> {
    let id = value_as_string(song.get("id"))?;
    let title = value_as_string(song.get("name"))?;
    let artists = artist_names(song.get("artists").or_else(|| song.get("ar")));
    let album = song
        .get("album")
        .or_else(|| song.get("al"))
        .and_then(|a| value_as_string(a.get("name")));
    let duration = value_as_f64(song.get("duration").or_else(|| song.get("dt"))).map(|ms| ms / 1000.0);

    Some(
        MatchCandidate::new(id, title, artists)
            .with_album(album)
            .with_duration(duration),
    )
}

impl LyricsProvider for NeteaseProvider {
    fn name(&self) -> &'static str {
        "netease"
    }

    fn get_lyrics(&mut self, query: &TrackQuery) -> Result<Option<LyricResult>> {
        let candidates = match self.search(query) {
            Ok(candidates) => candidates,
            Err(FetchError::Blocked(reason)) => {
                warn!(provider = "netease", %reason, "blocked by source");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let (best, score) = select_best(&candidates, query, &NETEASE_WEIGHTS);
        let Some(best) = best else {
            debug!(provider = "netease", score, rows = candidates.len(), "no confident match");
            return Ok(None);
        };
        info!(provider = "netease", id = %best.id, score, "matched track");

        let data = match self.fetch_lrc(&best.id) {
            Ok(data) => data,
            Err(FetchError::Blocked(reason)) => {
                warn!(provider = "netease", %reason, "blocked by source");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if data.get("nolyric").and_then(Value::as_bool) == Some(true) {
            return Ok(Some(LyricResult::instrumental()));
        }

        let lines = data
            .pointer("/lrc/lyric")
            .and_then(Value::as_str)
            .and_then(parse_lrc);
        let words = self.fetch_yrc(&best.id);

        let result = match (lines, words) {
            (Some(lines), words) => LyricResult::synced(lines).map(|r| r.with_word_synced(words)),
            (None, Some(words)) => LyricResult::from_word_synced(words),
            (None, None) => None,
        };
        Ok(result)
    }
}
