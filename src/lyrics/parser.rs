//! LRC format parser
//!
//! Parses line-synchronized lyrics in LRC format:
//! [mm:ss.xx] Lyrics line here
//!
//! Example:
//! [00:12.34] Hello world
//! [00:15.00][00:45.00] A repeated chorus line

use super::sort_by_time;
use crate::models::LyricLine;
use once_cell::sync::Lazy;
use regex::Regex;

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+):(\d{1,2})(?:[.:](\d{1,3}))?\]").expect("valid regex"));

/// Parse LRC text, dropping empty lines. `None` if no timed line survives.
pub fn parse_lrc(lrc_content: &str) -> Option<Vec<LyricLine>> {
    let mut lines = Vec::new();

    for line in lrc_content.lines() {
        let Some((timestamps, text)) = parse_lrc_line(line.trim()) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }

        for ts in timestamps {
            lines.push(LyricLine::new(ts, text.clone()));
        }
    }

    sort_by_time(&mut lines, |l| l.timestamp);

    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}

/// Split a line like `[00:12.34][00:20.00]Lyrics` into its timestamps and text.
/// Metadata tags (`[ar:Artist]`) and plain lines yield `None`.
fn parse_lrc_line(line: &str) -> Option<(Vec<f64>, String)> {
    if !line.starts_with('[') {
        return None;
    }
    // Bracket content must start with a digit, otherwise it is a tag
    if !line[1..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let mut timestamps = Vec::new();
    let mut rest = line;

    while let Some(captures) = TIMESTAMP_RE.captures(rest) {
        let minutes: f64 = captures[1].parse().ok()?;
        let seconds: f64 = captures[2].parse().ok()?;
        let fraction = captures
            .get(3)
            .map(|m| parse_fraction(m.as_str()))
            .unwrap_or(0.0);

        timestamps.push(minutes * 60.0 + seconds + fraction);
        rest = &rest[captures[0].len()..];
    }

    if timestamps.is_empty() {
        return None;
    }

    Some((timestamps, rest.trim().to_string()))
}

/// "5" -> 0.5, "34" -> 0.34, "340" -> 0.34
fn parse_fraction(digits: &str) -> f64 {
    let value: f64 = digits.parse().unwrap_or(0.0);
    value / 10f64.powi(digits.len() as i32)
}
