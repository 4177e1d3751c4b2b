use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use synclyrics::{
    config::Config,
    lyrics::cache::LyricsCache,
    models::{format_timestamp, LyricResult, TrackQuery},
    provider_factory,
    reliability::RateLimiters,
};

#[derive(Debug, Parser)]
#[command(name = "synclyrics", version, about = "Find time-synced lyrics for a track")]
struct Cli {
    artist: String,
    title: String,

    #[arg(long)]
    album: Option<String>,

    /// Track length in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Skip the on-disk cache
    #[arg(long)]
    no_cache: bool,

    /// Print word timing when a source provides it
    #[arg(long)]
    words: bool,
}

fn main() -> Result<ExitCode> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("synclyrics=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let query = TrackQuery::new(&cli.artist, &cli.title)
        .with_album(cli.album.clone())
        .with_duration(cli.duration);

    let cache = if cli.no_cache {
        None
    } else {
        match LyricsCache::new() {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "lyrics cache unavailable");
                None
            }
        }
    };

    let result = match cache.as_ref().and_then(|c| c.get(&query)) {
        Some(cached) => cached,
        None => {
            let limiters = RateLimiters::new();
            let mut resolver = provider_factory::build_default_resolver(&config, &limiters)
                .context("set up lyrics providers")?;
            let result = resolver.resolve_query(&query);

            if let Some(cache) = &cache {
                if let Err(e) = cache.set(&query, result.as_ref()) {
                    warn!(error = %e, "failed to write lyrics cache");
                }
            }
            result
        }
    };

    let Some(result) = result else {
        eprintln!("No synced lyrics found for {} - {}", query.artist, query.title);
        return Ok(ExitCode::FAILURE);
    };

    println!("{}", result.to_lrc());
    if cli.words {
        print_words(&result);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_words(result: &LyricResult) {
    let Some(lines) = &result.word_synced else {
        eprintln!("No word timing available");
        return;
    };

    println!();
    for line in lines {
        let words = line
            .words
            .iter()
            .map(|w| format!("<{}>{}", format_timestamp(line.start + w.time_offset), w.word))
            .collect::<Vec<_>>()
            .join(" ");
        println!("[{}]{words}", format_timestamp(line.start));
    }
}
