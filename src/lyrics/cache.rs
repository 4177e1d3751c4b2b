use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::models::{LyricResult, TrackQuery};

const CACHE_DIR: &str = ".cache/synclyrics/lyrics";
const CACHE_EXPIRY_DAYS: u64 = 7;

#[derive(Serialize, Deserialize)]
struct CachedLyrics {
    pub result: Option<LyricResult>, // None means "not found"
    pub cached_at: u64,
}

/// Resolved lyrics on disk, one JSON file per track.
#[derive(Clone)]
pub struct LyricsCache {
    cache_dir: PathBuf,
}

impl LyricsCache {
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Self::at(Path::new(&home).join(CACHE_DIR))
    }

    pub fn at(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("create cache dir {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    /// `Some(None)` is a cached miss, `None` means nothing is cached.
    pub fn get(&self, query: &TrackQuery) -> Option<Option<LyricResult>> {
        let cache_path = self.path_for(query);
        if !cache_path.exists() {
            return None;
        }

        let contents = fs::read_to_string(&cache_path).ok()?;
        let cached: CachedLyrics = match serde_json::from_str(&contents) {
            Ok(cached) => cached,
            Err(e) => {
                debug!(error = %e, path = %cache_path.display(), "dropping unreadable cache entry");
                let _ = fs::remove_file(&cache_path);
                return None;
            }
        };

        if now_secs() > cached.cached_at + CACHE_EXPIRY_DAYS * 24 * 60 * 60 {
            let _ = fs::remove_file(&cache_path);
            return None;
        }

        Some(cached.result)
    }

    pub fn set(&self, query: &TrackQuery, result: Option<&LyricResult>) -> Result<()> {
        let cached = CachedLyrics {
            result: result.cloned(),
            cached_at: now_secs(),
        };

        let json = serde_json::to_string_pretty(&cached)?;
        fs::write(self.path_for(query), json)?;

        Ok(())
    }

    fn path_for(&self, query: &TrackQuery) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", self.generate_key(query)))
    }

    fn generate_key(&self, query: &TrackQuery) -> String {
        let mut hasher = Sha256::new();
        let normalized = format!(
            "{}:{}:{}",
            query.artist.to_lowercase(),
            query.title.to_lowercase(),
            query.album.as_deref().unwrap_or_default().to_lowercase()
        );
        hasher.update(normalized.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
