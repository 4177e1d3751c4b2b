use serde::{Deserialize, Serialize};

/// Glyph used for instrumental breaks and instrumental tracks.
pub const INSTRUMENTAL_GLYPH: &str = "♪";

/// Fallback duration for a word whose computed duration is negative.
pub const FALLBACK_WORD_DURATION: f64 = 0.15;

/// What the caller knows about the track being played.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackQuery {
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub duration_secs: Option<f64>,
}

impl TrackQuery {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into().trim().to_string(),
            title: title.into().trim().to_string(),
            album: None,
            duration_secs: None,
        }
    }

    pub fn with_album(mut self, album: Option<String>) -> Self {
        self.album = album
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        self
    }

    pub fn with_duration(mut self, duration_secs: Option<f64>) -> Self {
        self.duration_secs = duration_secs.filter(|d| d.is_finite() && *d > 0.0);
        self
    }

    /// Whole seconds, the unit most lookup APIs take.
    pub fn duration_rounded(&self) -> Option<u64> {
        self.duration_secs.map(|d| d.round() as u64)
    }
}

/// One line-synced lyric line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Seconds from the start of the track
    pub timestamp: f64,
    pub text: String,
}

impl LyricLine {
    pub fn new(timestamp: f64, text: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.max(0.0),
            text: text.into(),
        }
    }
}

/// A word (or syllable run) inside a word-synced line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSpan {
    pub word: String,
    /// Seconds relative to the start of the owning line
    pub time_offset: f64,
    pub duration: f64,
}

impl WordSpan {
    /// Builds a span, clamping a negative duration to the fallback.
    pub fn new(word: impl Into<String>, time_offset: f64, duration: f64) -> Self {
        let duration = if duration < 0.0 {
            FALLBACK_WORD_DURATION
        } else {
            duration
        };
        Self {
            word: word.into(),
            time_offset: time_offset.max(0.0),
            duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedLine {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub words: Vec<WordSpan>,
}

/// The normalized result every provider converges on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricResult {
    pub lines: Vec<LyricLine>,
    pub is_instrumental: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_synced: Option<Vec<SyncedLine>>,
}

impl LyricResult {
    /// Wraps parsed lines. Returns `None` when there is nothing to show.
    pub fn synced(lines: Vec<LyricLine>) -> Option<Self> {
        if lines.is_empty() {
            return None;
        }
        Some(Self {
            lines,
            is_instrumental: false,
            word_synced: None,
        })
    }

    pub fn instrumental() -> Self {
        Self {
            lines: vec![LyricLine::new(0.0, INSTRUMENTAL_GLYPH)],
            is_instrumental: true,
            word_synced: None,
        }
    }

    /// Attaches word timing; an empty set is ignored.
    pub fn with_word_synced(mut self, words: Option<Vec<SyncedLine>>) -> Self {
        self.word_synced = words.filter(|w| !w.is_empty());
        self
    }

    /// Derives line timing from word-synced lines.
    pub fn from_word_synced(lines: Vec<SyncedLine>) -> Option<Self> {
        let plain = lines
            .iter()
            .map(|l| LyricLine::new(l.start, l.text.clone()))
            .collect();
        Self::synced(plain).map(|r| r.with_word_synced(Some(lines)))
    }

    pub fn to_lrc(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("[{}]{}", format_timestamp(l.timestamp), l.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Formats seconds as an LRC `mm:ss.xx` timestamp.
pub fn format_timestamp(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let minutes = centis / 6000;
    let secs = (centis % 6000) / 100;
    let hundredths = centis % 100;
    format!("{minutes:02}:{secs:02}.{hundredths:02}")
}

/// A search-result row from one source, scored once and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_secs: Option<f64>,
    /// Source-specific id used to fetch lyrics once selected
    pub id: String,
}

impl MatchCandidate {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artists: Vec<String>) -> Self {
        Self {
            title: title.into(),
            artists,
            album: None,
            duration_secs: None,
            id: id.into(),
        }
    }

    pub fn with_album(mut self, album: Option<String>) -> Self {
        self.album = album.filter(|a| !a.is_empty());
        self
    }

    pub fn with_duration(mut self, duration_secs: Option<f64>) -> Self {
        self.duration_secs = duration_secs;
        self
    }
}
