//! Musixmatch subtitle JSON parser
//!
//! `[{"text": "Line", "time": {"total": 12.34, "minutes": 0, "seconds": 12, "hundredths": 34}}]`
//!
//! Unlike LRC, an empty text marks an instrumental break and is kept.

use super::sort_by_time;
use crate::models::{LyricLine, INSTRUMENTAL_GLYPH};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SubtitleLine {
    #[serde(default)]
    text: String,
    time: SubtitleTime,
}

#[derive(Debug, Deserialize)]
struct SubtitleTime {
    total: Option<f64>,
    #[serde(default)]
    minutes: f64,
    #[serde(default)]
    seconds: f64,
    #[serde(default)]
    hundredths: f64,
}

impl SubtitleTime {
    fn seconds(&self) -> f64 {
        self.total
            .unwrap_or(self.minutes * 60.0 + self.seconds + self.hundredths / 100.0)
    }
}

pub fn parse_subtitles(body: &str) -> Option<Vec<LyricLine>> {
    let records: Vec<serde_json::Value> = serde_json::from_str(body).ok()?;

    let mut lines: Vec<LyricLine> = records
        .into_iter()
        .filter_map(|record| serde_json::from_value::<SubtitleLine>(record).ok())
        .map(|line| {
            let text = line.text.trim();
            let text = if text.is_empty() {
                INSTRUMENTAL_GLYPH
            } else {
                text
            };
            LyricLine::new(line.time.seconds(), text)
        })
        .collect();

    sort_by_time(&mut lines, |l| l.timestamp);

    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}
