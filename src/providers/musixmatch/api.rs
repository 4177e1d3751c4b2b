use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::auth::APP_ID;
use crate::lyrics::parse_richsync;
use crate::models::{MatchCandidate, SyncedLine, TrackQuery};
use crate::reliability::{FetchError, HttpRequest, RetryExecutor};

pub const DEFAULT_BASE_URL: &str = "https://apic-desktop.musixmatch.com/ws/1.1";

/// `matcher.track.get` payload. Flags arrive as 0/1 integers.
#[derive(Debug, Clone, Deserialize)]
pub struct MxmTrack {
    pub track_id: u64,
    #[serde(default)]
    pub track_name: String,
    #[serde(default)]
    pub artist_name: String,
    pub album_name: Option<String>,
    pub track_length: Option<f64>,
    #[serde(default)]
    pub instrumental: u8,
    #[serde(default)]
    pub has_subtitles: u8,
    #[serde(default)]
    pub has_richsync: u8,
}

impl MxmTrack {
    pub fn is_instrumental(&self) -> bool {
        self.instrumental == 1
    }

    pub fn has_richsync(&self) -> bool {
        self.has_richsync == 1
    }

    pub fn to_candidate(&self) -> MatchCandidate {
        MatchCandidate::new(
            self.track_id.to_string(),
            self.track_name.clone(),
            vec![self.artist_name.clone()],
        )
        .with_album(self.album_name.clone())
        .with_duration(self.track_length.filter(|l| *l > 0.0))
    }
}

/// Outcome of one `macro.subtitles.get` call.
#[derive(Debug)]
pub enum Lookup {
    Found {
        track: MxmTrack,
        subtitle_body: Option<String>,
    },
    NotFound,
    /// The session token was rejected and may be renewed.
    TokenExpired,
}

pub struct MusixmatchApi {
    http: RetryExecutor,
    base_url: String,
}

impl MusixmatchApi {
    pub fn new(http: RetryExecutor, base_url: String) -> Self {
        Self { http, base_url }
    }

    pub fn lookup(&self, query: &TrackQuery, token: &str) -> Result<Lookup, FetchError> {
        let mut request = HttpRequest::get(format!("{}/macro.subtitles.get", self.base_url))
            .header("Cookie", "x-mxm-token-guid=")
            .query("format", "json")
            .query("namespace", "lyrics_richsynched")
            .query("subtitle_format", "mxm")
            .query("app_id", APP_ID)
            .query("q_artist", &query.artist)
            .query("q_artists", &query.artist)
            .query("q_track", &query.title);

        if let Some(album) = &query.album {
            request = request.query("q_album", album);
        }
        if let Some(duration) = query.duration_rounded() {
            request = request
                .query("q_duration", duration)
                .query("f_subtitle_length", duration);
        }
        let request = request.query("usertoken", token);

        let data: Value = self.http.execute_json(&request)?;
        parse_lookup(&data)
    }

    /// Word-level lyrics for a matched track.
    pub fn richsync(&self, track_id: u64, token: &str) -> Result<Option<Vec<SyncedLine>>, FetchError> {
        let request = HttpRequest::get(format!("{}/track.richsync.get", self.base_url))
            .header("Cookie", "x-mxm-token-guid=")
            .query("format", "json")
            .query("app_id", APP_ID)
            .query("track_id", track_id)
            .query("usertoken", token);

        let data: Value = self.http.execute_json(&request)?;
        let status = header_status(&data);
        if status != 200 {
            debug!(provider = "musixmatch", track_id, status, "no richsync");
            return Ok(None);
        }

        Ok(data
            .pointer("/message/body/richsync/richsync_body")
            .and_then(Value::as_str)
            .and_then(parse_richsync))
    }
}

fn header_status(data: &Value) -> i64 {
    data.pointer("/message/header/status_code")
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

fn parse_lookup(data: &Value) -> Result<Lookup, FetchError> {
    let status = header_status(data);
    if status == 401 {
        let hint = data
            .pointer("/message/header/hint")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return match hint {
            "captcha" => Err(FetchError::Blocked("captcha".to_string())),
            // "renew" and anything else on a 401 is an auth failure
            _ => Ok(Lookup::TokenExpired),
        };
    }
    if status != 200 {
        warn!(provider = "musixmatch", status, "unexpected lookup status");
        return Err(FetchError::Status(status.clamp(0, u16::MAX as i64) as u16));
    }

    // An unmatched lookup sends `macro_calls` as an empty array
    let Some(calls) = data.pointer("/message/body/macro_calls").and_then(Value::as_object) else {
        return Ok(Lookup::NotFound);
    };

    let matcher = calls.get("matcher.track.get");
    let matcher_status = matcher
        .and_then(|m| m.pointer("/message/header/status_code"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if matcher_status != 200 {
        return Ok(Lookup::NotFound);
    }

    let track = matcher
        .and_then(|m| m.pointer("/message/body/track"))
        .cloned()
        .map(serde_json::from_value::<MxmTrack>)
        .transpose()
        .map_err(|e| FetchError::Parse(e.to_string()))?;
    let Some(track) = track else {
        return Ok(Lookup::NotFound);
    };

    let subtitle_body = calls
        .get("track.subtitles.get")
        .and_then(|s| s.pointer("/message/body/subtitle_list/0/subtitle/subtitle_body"))
        .and_then(Value::as_str)
        .filter(|b| !b.trim().is_empty())
        .map(str::to_string);

    Ok(Lookup::Found {
        track,
        subtitle_body,
    })
}
