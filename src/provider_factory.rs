use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::{Config, ProviderConfig};
use crate::providers::{
    LrclibProvider, MusixmatchProvider, NeteaseProvider, QqProvider, SpotifyProvider,
};
use crate::reliability::{RateLimiters, ReqwestTransport, RetryExecutor, RetryPolicy, Transport};
use crate::resolver::LyricsResolver;

fn executor(transport: &Arc<dyn Transport>, settings: &ProviderConfig) -> RetryExecutor {
    let policy = RetryPolicy {
        max_attempts: settings.retries.max(1),
        timeout: settings.timeout,
        ..RetryPolicy::default()
    };
    RetryExecutor::new(Arc::clone(transport), policy)
}

pub fn create_spotify_provider(
    config: &Config,
    transport: &Arc<dyn Transport>,
) -> Option<SpotifyProvider> {
    if !config.has_spotify_credentials() {
        return None;
    }

    Some(SpotifyProvider::new(
        executor(transport, &config.spotify),
        config.spotify_client_id.clone()?,
        config.spotify_client_secret.clone()?,
        config.spotify_proxy_url.clone()?,
        config.spotify.base_url.clone(),
    ))
}

/// Builds every enabled provider. Resolvers built from the same `limiters`
/// share one request budget per rate-limited source.
pub fn build_resolver(
    config: &Config,
    transport: Arc<dyn Transport>,
    limiters: &RateLimiters,
) -> LyricsResolver {
    let mut resolver = LyricsResolver::new();

    let lrclib = &config.lrclib;
    if lrclib.enabled {
        let http = executor(&transport, lrclib)
            .with_rate_limiter(limiters.for_source("lrclib", lrclib.min_interval));
        resolver.add(
            Box::new(LrclibProvider::new(http, lrclib.base_url.clone())),
            true,
            lrclib.priority,
        );
    }

    let musixmatch = &config.musixmatch;
    if musixmatch.enabled {
        let provider = MusixmatchProvider::new(
            executor(&transport, musixmatch),
            limiters.for_source("musixmatch", musixmatch.min_interval),
            musixmatch.base_url.clone(),
            config.musixmatch_fallback_token.clone(),
            config.musixmatch_token_ttl,
        );
        resolver.add(Box::new(provider), true, musixmatch.priority);
    }

    let netease = &config.netease;
    if netease.enabled {
        let http = executor(&transport, netease)
            .with_rate_limiter(limiters.for_source("netease", netease.min_interval));
        resolver.add(
            Box::new(NeteaseProvider::new(http, netease.base_url.clone())),
            true,
            netease.priority,
        );
    }

    let qq = &config.qq;
    if qq.enabled {
        let http = executor(&transport, qq)
            .with_rate_limiter(limiters.for_source("qq", qq.min_interval));
        resolver.add(
            Box::new(QqProvider::new(http, qq.base_url.clone())),
            true,
            qq.priority,
        );
    }

    if config.spotify.enabled {
        match create_spotify_provider(config, &transport) {
            Some(provider) => resolver.add(Box::new(provider), true, config.spotify.priority),
            None => debug!("spotify credentials or proxy url missing, skipping"),
        }
    }

    info!(providers = ?resolver.provider_names(), "resolver ready");
    resolver
}

/// `build_resolver` over the real HTTP client.
pub fn build_default_resolver(config: &Config, limiters: &RateLimiters) -> Result<LyricsResolver> {
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
    Ok(build_resolver(config, transport, limiters))
}
