use crate::models::{LyricResult, TrackQuery};
use crate::reliability::FetchError;
use anyhow::Result;
use serde_json::Value;

pub mod lrclib;
pub mod musixmatch;
pub mod netease;
pub mod qq;
pub mod spotify;

pub use lrclib::LrclibProvider;
pub use musixmatch::MusixmatchProvider;
pub use netease::NeteaseProvider;
pub use qq::QqProvider;
pub use spotify::SpotifyProvider;

/// One external lyrics source.
///
/// `Ok(None)` means the source has no synchronized lyrics for the track,
/// including plain-only hits, low-confidence matches and hard blocks.
/// `Err` is reserved for faults the resolver should log and skip past.
pub trait LyricsProvider: Send {
    fn name(&self) -> &'static str;

    fn get_lyrics(&mut self, query: &TrackQuery) -> Result<Option<LyricResult>>;
}

/// Treat a 404 as an empty answer instead of a failure.
pub(crate) fn not_found_as_none<T>(result: Result<T, FetchError>) -> Result<Option<T>, FetchError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// String field that some APIs send as a number.
pub(crate) fn value_as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn value_as_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `[{"name": "A"}, {"name": "B"}]` -> `["A", "B"]`
pub(crate) fn artist_names(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|artists| {
            artists
                .iter()
                .filter_map(|a| value_as_string(a.get("name")))
                .collect()
        })
        .unwrap_or_default()
}
