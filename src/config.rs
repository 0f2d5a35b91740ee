use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::gateway::spotify::SpotifyCredentials;

/// Application configuration loaded from TOML config file, then overlaid
/// with environment variables once at startup.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Local catalog document (overrides XDG default).
    pub catalog_path: Option<PathBuf>,
    /// Mapping document (overrides XDG default).
    pub mapping_path: Option<PathBuf>,
    /// Default cap on releases processed per match run.
    pub match_limit: Option<usize>,
    /// Shuffle release order before matching.
    pub shuffle: bool,
    pub spotify: SpotifyConfig,
    pub discogs: DiscogsConfig,
}

/// Spotify Web API settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Pause after each release in milliseconds.
    pub pace_ms: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            pace_ms: 100,
        }
    }
}

/// Discogs API settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DiscogsConfig {
    pub username: Option<String>,
    /// Personal access token.
    pub token: Option<String>,
    pub per_page: usize,
    /// Pause between collection pages in milliseconds.
    pub page_pause_ms: u64,
    /// Wait before retrying after HTTP 429, in seconds.
    pub rate_limit_wait_secs: u64,
}

impl Default for DiscogsConfig {
    fn default() -> Self {
        Self {
            username: None,
            token: None,
            per_page: 50,
            page_pause_ms: 1000,
            rate_limit_wait_secs: 10,
        }
    }
}

/// Everything a match run needs, resolved before the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub catalog_path: PathBuf,
    pub mapping_path: PathBuf,
    /// Maximum releases to process; `None` processes the whole catalog.
    pub limit: Option<usize>,
    pub shuffle: bool,
    pub pace: Duration,
}

impl AppConfig {
    /// Load config from `~/.config/discomatch/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }),
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Overlay process environment variables.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay variables from `lookup`; set values win over the file.
    ///
    /// An unparsable `MATCH_LIMIT` is ignored with a warning.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(v);
        }
        if let Some(v) = var("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(v);
        }
        if let Some(v) = var("MATCH_LIMIT") {
            match v.trim().parse::<usize>() {
                Ok(n) => self.match_limit = Some(n),
                Err(e) => log::warn!("Ignoring MATCH_LIMIT={v:?}: {e}"),
            }
        }
        if let Some(v) = var("SHUFFLE_RELEASES") {
            self.shuffle = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = var("DISCOGS_USERNAME") {
            self.discogs.username = Some(v);
        }
        if let Some(v) = var("DISCOGS_TOKEN") {
            self.discogs.token = Some(v);
        }
        self
    }

    /// Spotify credentials, if both halves are configured.
    pub fn spotify_credentials(&self) -> Option<SpotifyCredentials> {
        match (&self.spotify.client_id, &self.spotify.client_secret) {
            (Some(id), Some(secret)) => Some(SpotifyCredentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => None,
        }
    }

    /// Resolve a match run. `limit` and `shuffle` from the CLI take precedence.
    pub fn run_config(&self, limit: Option<usize>, shuffle: bool) -> RunConfig {
        RunConfig {
            catalog_path: self.catalog_path(),
            mapping_path: self.mapping_path(),
            limit: limit.or(self.match_limit),
            shuffle: shuffle || self.shuffle,
            pace: Duration::from_millis(self.spotify.pace_ms),
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| data_file("discogs_collection.json"))
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.mapping_path
            .clone()
            .unwrap_or_else(|| data_file("discogs_spotify_mapping.json"))
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve a document path in the XDG data directory.
fn data_file(name: &str) -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        dirs.data_dir().join(name)
    } else {
        // Fallback: current directory
        PathBuf::from(name)
    }
}
