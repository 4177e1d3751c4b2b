//! Synced-lyrics wire formats
//!
//! One parser per format, all converging on the types in `crate::models`:
//! - LRC text (line-synced)
//! - YRC text (word-synced, absolute word times)
//! - RichSync JSON (word-synced, offset word times)
//! - Musixmatch subtitle JSON (line-synced)
//!
//! Parsers never fail: malformed records are skipped and `None` means no
//! usable record was found.

pub mod cache;
pub mod parser;
pub mod richsync;
pub mod subtitle;
pub mod yrc;

pub use parser::parse_lrc;
pub use richsync::parse_richsync;
pub use subtitle::parse_subtitles;
pub use yrc::parse_yrc;

/// Stable sort by a time key, so equal timestamps keep source order.
pub(crate) fn sort_by_time<T>(items: &mut [T], key: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| key(a).total_cmp(&key(b)));
}
