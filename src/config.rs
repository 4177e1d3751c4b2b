use std::time::Duration;

/// Resolved settings for one lyrics source.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub enabled: bool,
    /// Lower runs first
    pub priority: i32,
    pub timeout: Duration,
    pub retries: u32,
    pub base_url: Option<String>,
    /// Minimum spacing between requests; zero disables the limiter
    pub min_interval: Duration,
}

impl ProviderConfig {
    pub fn with_defaults(priority: i32, min_interval: Duration) -> Self {
        Self {
            enabled: true,
            priority,
            timeout: Duration::from_secs(10),
            retries: 3,
            base_url: None,
            min_interval,
        }
    }

    /// Reads `SYNCLYRICS_<SOURCE>_*` overrides on top of `defaults`.
    fn from_env(source: &str, defaults: Self) -> Self {
        let prefix = format!("SYNCLYRICS_{}", source.to_uppercase());
        let var = |name: &str| env_var(&format!("{prefix}_{name}"));

        Self {
            enabled: var("ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enabled),
            priority: var("PRIORITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.priority),
            timeout: var("TIMEOUT_SECS")
                .and_then(|v| parse_secs(&v))
                .unwrap_or(defaults.timeout),
            retries: var("RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retries),
            base_url: var("BASE_URL").or(defaults.base_url),
            min_interval: var("MIN_INTERVAL_SECS")
                .and_then(|v| parse_secs(&v))
                .unwrap_or(defaults.min_interval),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub lrclib: ProviderConfig,
    pub musixmatch: ProviderConfig,
    pub netease: ProviderConfig,
    pub qq: ProviderConfig,
    pub spotify: ProviderConfig,
    pub musixmatch_fallback_token: Option<String>,
    pub musixmatch_token_ttl: Duration,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_proxy_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lrclib: ProviderConfig::with_defaults(1, Duration::ZERO),
            musixmatch: ProviderConfig::with_defaults(2, Duration::from_secs(12)),
            netease: ProviderConfig::with_defaults(3, Duration::ZERO),
            qq: ProviderConfig::with_defaults(4, Duration::ZERO),
            spotify: ProviderConfig::with_defaults(5, Duration::ZERO),
            musixmatch_fallback_token: None,
            musixmatch_token_ttl: Duration::from_secs(600),
            spotify_client_id: None,
            spotify_client_secret: None,
            spotify_proxy_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            lrclib: ProviderConfig::from_env("lrclib", defaults.lrclib),
            musixmatch: ProviderConfig::from_env("musixmatch", defaults.musixmatch),
            netease: ProviderConfig::from_env("netease", defaults.netease),
            qq: ProviderConfig::from_env("qq", defaults.qq),
            spotify: ProviderConfig::from_env("spotify", defaults.spotify),
            musixmatch_fallback_token: env_var("MUSIXMATCH_FALLBACK_TOKEN"),
            musixmatch_token_ttl: env_var("MUSIXMATCH_TOKEN_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.musixmatch_token_ttl),
            spotify_client_id: env_var("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: env_var("SPOTIFY_CLIENT_SECRET"),
            spotify_proxy_url: env_var("SPOTIFY_LYRICS_PROXY_URL"),
        }
    }

    pub fn has_spotify_credentials(&self) -> bool {
        self.spotify_client_id.is_some()
            && self.spotify_client_secret.is_some()
            && self.spotify_proxy_url.is_some()
    }
}

/// Unset and blank variables both read as `None`.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_secs(value: &str) -> Option<Duration> {
    value
        .parse::<f64>()
        .ok()
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests don't interfere with each other
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 9] = [
        "SYNCLYRICS_LRCLIB_ENABLED",
        "SYNCLYRICS_NETEASE_PRIORITY",
        "SYNCLYRICS_QQ_TIMEOUT_SECS",
        "SYNCLYRICS_MUSIXMATCH_MIN_INTERVAL_SECS",
        "SYNCLYRICS_LRCLIB_BASE_URL",
        "MUSIXMATCH_FALLBACK_TOKEN",
        "SPOTIFY_CLIENT_ID",
        "SPOTIFY_CLIENT_SECRET",
        "SPOTIFY_LYRICS_PROXY_URL",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_from_env_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let config = Config::from_env();
        assert!(config.lrclib.enabled);
        assert_eq!(config.lrclib.priority, 1);
        assert_eq!(config.musixmatch.priority, 2);
        assert_eq!(config.netease.priority, 3);
        assert_eq!(config.qq.priority, 4);
        assert_eq!(config.spotify.priority, 5);
        assert_eq!(config.musixmatch.min_interval, Duration::from_secs(12));
        assert_eq!(config.netease.min_interval, Duration::ZERO);
        assert_eq!(config.qq.timeout, Duration::from_secs(10));
        assert_eq!(config.lrclib.retries, 3);
        assert!(config.musixmatch_fallback_token.is_none());
        assert!(!config.has_spotify_credentials());
    }

    #[test]
    fn test_from_env_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("SYNCLYRICS_LRCLIB_ENABLED", "false");
        std::env::set_var("SYNCLYRICS_NETEASE_PRIORITY", "0");
        std::env::set_var("SYNCLYRICS_QQ_TIMEOUT_SECS", "2.5");
        std::env::set_var("SYNCLYRICS_MUSIXMATCH_MIN_INTERVAL_SECS", "0");
        std::env::set_var("SYNCLYRICS_LRCLIB_BASE_URL", "http://localhost:3000/api");
        std::env::set_var("MUSIXMATCH_FALLBACK_TOKEN", "shared");

        let config = Config::from_env();
        assert!(!config.lrclib.enabled);
        assert_eq!(config.netease.priority, 0);
        assert_eq!(config.qq.timeout, Duration::from_millis(2500));
        assert_eq!(config.musixmatch.min_interval, Duration::ZERO);
        assert_eq!(
            config.lrclib.base_url.as_deref(),
            Some("http://localhost:3000/api")
        );
        assert_eq!(config.musixmatch_fallback_token.as_deref(), Some("shared"));

        clear_env();
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("SYNCLYRICS_LRCLIB_ENABLED", "maybe");
        std::env::set_var("SYNCLYRICS_NETEASE_PRIORITY", "first");
        std::env::set_var("MUSIXMATCH_FALLBACK_TOKEN", "   ");

        let config = Config::from_env();
        assert!(config.lrclib.enabled);
        assert_eq!(config.netease.priority, 3);
        assert!(config.musixmatch_fallback_token.is_none());

        clear_env();
    }

    #[test]
    fn test_has_spotify_credentials() {
        let mut config = Config {
            spotify_client_id: Some("id".to_string()),
            spotify_client_secret: Some("secret".to_string()),
            ..Config::default()
        };
        assert!(!config.has_spotify_credentials());

        config.spotify_proxy_url = Some("https://proxy.example.com".to_string());
        assert!(config.has_spotify_credentials());

        config.spotify_client_secret = None;
        assert!(!config.has_spotify_credentials());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("12"), Some(Duration::from_secs(12)));
        assert_eq!(parse_secs("-1"), None);
        assert_eq!(parse_secs("NaN"), None);
        assert_eq!(parse_secs("inf"), None);
        assert_eq!(parse_secs("1e30"), None);
    }
}
