pub mod config;
pub mod lyrics;
pub mod matching;
pub mod models;
pub mod provider_factory;
pub mod providers;
pub mod reliability;
pub mod resolver;

pub use models::{LyricLine, LyricResult, SyncedLine, TrackQuery, WordSpan};
pub use resolver::LyricsResolver;
