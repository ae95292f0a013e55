//! Configuration management for reviewhound.
//!
//! Configuration is read from `~/.config/reviewhound/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::pipeline::{PipelineConfig, SiteConfig};
use crate::scraper::DriverConfig;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub browser: DriverConfig,
    pub site: SiteConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to `<data dir>/reviewhound/reviewhound.db`
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookies file; defaults to `<data dir>/reviewhound/cookies.json`
    pub cookies_path: Option<PathBuf>,

    /// Write each driver's cookies back after every identifier
    pub refresh_after_scrape: bool,

    /// Page opened for interactive login; defaults to the site base URL
    pub home_url: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookies_path: None,
            refresh_after_scrape: true,
            home_url: None,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Load from an explicit path, creating a commented default if missing
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/reviewhound/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("reviewhound").join("config.toml"))
    }

    /// Directory holding the database and the cookies file
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("reviewhound"))
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match self.database.path {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("reviewhound.db")),
        }
    }

    pub fn cookies_path(&self) -> Result<PathBuf, ConfigError> {
        match self.session.cookies_path {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("cookies.json")),
        }
    }

    pub fn home_url(&self) -> &str {
        self.session
            .home_url
            .as_deref()
            .unwrap_or(&self.site.base_url)
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# reviewhound configuration
#
# Durations ending in _secs are seconds, _ms milliseconds.

[server]
host = "0.0.0.0"
port = 3000

[database]
# SQLite database file (default: <data dir>/reviewhound/reviewhound.db)
# path = "/var/lib/reviewhound/reviewhound.db"

[session]
# Cookies captured by `reviewhound login` (default: <data dir>/reviewhound/cookies.json)
# cookies_path = "/var/lib/reviewhound/cookies.json"

# Save each browser's cookies back after every product
refresh_after_scrape = true

[browser]
# Run browsers without a visible window
headless = true

# Extra Chrome switches
chrome_args = []

# Browser language; review counts and dates are parsed as English text
locale = "en-US"

# Synthetic user agents claim a Chrome major version in this range
chrome_major_min = 118
chrome_major_max = 124

# Viewport size is drawn from these ranges for every browser
viewport_width_min = 1200
viewport_width_max = 1400
viewport_height_min = 700
viewport_height_max = 900

# Pointer moves and a scroll after the first navigation
humanize = true
pointer_moves = 3
pause_min_ms = 500
pause_max_ms = 1500

[site]
base_url = "https://www.amazon.com"

[pipeline]
# Browsers opened per scrape
max_drivers = 3

# Competitors kept, and results considered before deduplication
competitor_limit = 5
discovery_over_fetch = 6

# Reviews collected per product and polarity
critical_target = 50
positive_target = 50

search_nav_timeout_secs = 60
search_wait_timeout_secs = 30
detail_nav_timeout_secs = 45
title_wait_timeout_secs = 15
review_nav_timeout_secs = 30

discovery_attempts = 3
description_attempts = 2
description_backoff_ms = 3000

# Consecutive empty review pages before giving up on a listing
empty_page_budget = 3

# Delay between review pages: base per polarity plus random jitter
critical_pacing_ms = 1000
positive_pacing_ms = 1500
pacing_jitter_ms = 1000
settle_ms = 1000
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
