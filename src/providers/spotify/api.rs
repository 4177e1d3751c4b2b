use serde::Deserialize;
use serde_json::Value;

use crate::lyrics::sort_by_time;
use crate::models::{LyricLine, MatchCandidate, TrackQuery, INSTRUMENTAL_GLYPH};
use crate::providers::{artist_names, value_as_f64, value_as_string};
use crate::reliability::{FetchError, HttpRequest, RetryExecutor};

pub const API_BASE_URL: &str = "https://api.spotify.com/v1";
const SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct ProxyResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(rename = "syncType")]
    pub sync_type: Option<String>,
    #[serde(default)]
    pub lines: Vec<ProxyLine>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyLine {
    /// Milliseconds, sent as a string
    #[serde(rename = "startTimeMs", default)]
    pub start_time_ms: Value,
    #[serde(default)]
    pub words: String,
}

impl ProxyResponse {
    /// Line-synced rows, or `None` for unsynced and error answers.
    pub fn into_lines(self) -> Option<Vec<LyricLine>> {
        if self.error || self.sync_type.as_deref() == Some("UNSYNCED") {
            return None;
        }

        let mut lines: Vec<LyricLine> = self
            .lines
            .into_iter()
            .filter_map(|line| {
                let ms = value_as_f64(Some(&line.start_time_ms))?;
                let words = line.words.trim();
                let text = if words.is_empty() {
                    INSTRUMENTAL_GLYPH
                } else {
                    words
                };
                Some(LyricLine::new(ms / 1000.0, text))
            })
            .collect();
        sort_by_time(&mut lines, |l| l.timestamp);

        if lines.is_empty() {
            None
        } else {
            Some(lines)
        }
    }
}

pub struct SpotifyApi {
    http: RetryExecutor,
    base_url: String,
    proxy_url: String,
}

impl SpotifyApi {
    pub fn new(http: RetryExecutor, base_url: String, proxy_url: String) -> Self {
        Self {
            http,
            base_url,
            proxy_url: proxy_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn search_tracks(&self, query: &TrackQuery, token: &str) -> Result<Vec<MatchCandidate>, FetchError> {
        let request = HttpRequest::get(format!("{}/search", self.base_url))
            .bearer_auth(token)
            .query("q", format!("track:{} artist:{}", query.title, query.artist))
            .query("type", "track")
            .query("limit", SEARCH_LIMIT);

        let data: Value = self.http.execute_json(&request)?;
        let items = data
            .pointer("/tracks/items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(items.iter().filter_map(item_to_candidate).collect())
    }

    pub fn fetch_lyrics(&self, track_id: &str) -> Result<Option<Vec<LyricLine>>, FetchError> {
        let request = HttpRequest::get(format!("{}/", self.proxy_url)).query("trackid", track_id);
        let response: ProxyResponse = self.http.execute_json(&request)?;
        Ok(response.into_lines())
    }
}

fn item_to_candidate(item: &Value) -> Option<MatchCandidate> {
    let id = value_as_string(item.get("id"))?;
    let title = value_as_string(item.get("name"))?;
    let album = item.get("album").and_then(|a| value_as_string(a.get("name")));
    let duration = value_as_f64(item.get("duration_ms")).map(|ms| ms / 1000.0);

    Some(
        MatchCandidate::new(id, title, artist_names(item.get("artists")))
            .with_album(album)
            .with_duration(duration),
    )
}
