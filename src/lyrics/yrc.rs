//! YRC (NetEase word-level) parser
//!
//! Each lyric line looks like:
//! [12000,3500](12000,400,0)Hel(12400,600,0)lo(13000,2500,0)world
//!
//! The bracket holds the line start and duration in milliseconds, each
//! parenthesised run holds an absolute word start, word duration and a flag.
//! Lines that start with `{` carry credits JSON and are skipped.

use super::sort_by_time;
use crate::models::{SyncedLine, WordSpan};
use once_cell::sync::Lazy;
use regex::Regex;

static LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+),(\d+)\](.*)$").expect("valid regex"));
static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d+),(\d+),-?\d+\)([^(]*)").expect("valid regex"));

pub fn parse_yrc(content: &str) -> Option<Vec<SyncedLine>> {
    let mut lines: Vec<SyncedLine> = content
        .lines()
        .filter_map(|line| parse_yrc_line(line.trim()))
        .collect();

    sort_by_time(&mut lines, |l| l.start);

    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}

fn parse_yrc_line(line: &str) -> Option<SyncedLine> {
    let captures = LINE_RE.captures(line)?;
    let start_ms: u64 = captures[1].parse().ok()?;
    let duration_ms: u64 = captures[2].parse().ok()?;
    let end_ms = start_ms.checked_add(duration_ms)?;
    let body = &captures[3];

    let start = start_ms as f64 / 1000.0;
    let mut words = Vec::new();

    for run in WORD_RE.captures_iter(body) {
        let (Ok(word_start), Ok(word_duration)) = (run[1].parse::<u64>(), run[2].parse::<u64>())
        else {
            continue;
        };
        let word = run[3].trim();
        if word.is_empty() {
            continue;
        }
        let offset = (word_start as f64 - start_ms as f64) / 1000.0;
        words.push(WordSpan::new(word, offset, word_duration as f64 / 1000.0));
    }

    if words.is_empty() {
        return None;
    }

    let text = words
        .iter()
        .map(|w| w.word.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(SyncedLine {
        start,
        end: end_ms as f64 / 1000.0,
        text,
        words,
    })
}
