//! RichSync (Musixmatch word-level) parser
//!
//! The body is a JSON array of lines:
//! `{"ts": 10.0, "te": 12.0, "l": [{"c": "Hi", "o": 0.0}, ...], "x": "Hi there"}`
//! `ts`/`te` are absolute line bounds in seconds, `o` is a run offset from `ts`.

use super::sort_by_time;
use crate::models::{SyncedLine, WordSpan};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RichSyncLine {
    ts: f64,
    te: f64,
    #[serde(default)]
    l: Vec<RichSyncRun>,
    #[serde(default)]
    x: String,
}

#[derive(Debug, Deserialize)]
struct RichSyncRun {
    #[serde(default)]
    c: String,
    #[serde(default)]
    o: f64,
}

pub fn parse_richsync(body: &str) -> Option<Vec<SyncedLine>> {
    let records: Vec<serde_json::Value> = match serde_json::from_str(body) {
        Ok(records) => records,
        Err(e) => {
            debug!(error = %e, "richsync body is not a JSON array");
            return None;
        }
    };

    let mut lines: Vec<SyncedLine> = records
        .into_iter()
        .filter_map(|record| serde_json::from_value::<RichSyncLine>(record).ok())
        .map(convert_line)
        .collect();

    sort_by_time(&mut lines, |l| l.start);

    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}

fn convert_line(line: RichSyncLine) -> SyncedLine {
    let line_duration = line.te - line.ts;
    let mut words = Vec::new();

    for (i, run) in line.l.iter().enumerate() {
        if run.c.trim().is_empty() {
            continue;
        }
        // Duration runs until the next run starts, whitespace runs included
        let next_offset = line.l.get(i + 1).map(|next| next.o).unwrap_or(line_duration);
        words.push(WordSpan::new(run.c.clone(), run.o, next_offset - run.o));
    }

    SyncedLine {
        start: line.ts,
        end: line.te.max(line.ts),
        text: line.x,
        words,
    }
}
