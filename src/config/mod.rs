pub mod env;
pub mod validation;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::env::{EnvParser, EnvVars};
use crate::config::validation::ConfigValidator;
use crate::error::{CrawlError, Result};

pub const DEFAULT_SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_GENIUS_API_SEARCH_URL: &str = "https://api.genius.com/search";
pub const DEFAULT_GENIUS_BASE_URL: &str = "https://genius.com";

fn default_years() -> Vec<String> {
    ["2019", "2020", "2021", "2022"]
        .iter()
        .map(|y| y.to_string())
        .collect()
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the catalog search API
    pub spotify_api_base: String,

    /// OAuth2 token endpoint for the catalog API
    pub spotify_token_url: String,

    /// Search endpoint of the lyrics API
    pub genius_api_search_url: String,

    /// Base URL that lyrics page paths are resolved against
    pub genius_base_url: String,

    /// Directory receiving one JSON file per page or per track
    pub output_dir: PathBuf,

    /// Genre filter applied to every seed query
    pub genre: String,

    /// Release years; one seed query is issued per year
    #[serde(default = "default_years")]
    pub years: Vec<String>,

    /// Market (ISO 3166-1 alpha-2) the search is restricted to
    pub market: String,

    /// Results per page
    pub page_size: u32,

    /// Ceiling on requests in flight at once
    pub max_concurrent_requests: usize,

    /// Delay applied before every dispatched request (milliseconds)
    pub request_delay_ms: u64,

    /// Per-request timeout (seconds)
    pub request_timeout_seconds: u64,

    /// Attempts per request before giving up on transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Only accept lyrics candidates whose title and artist contain the track's
    #[serde(default)]
    pub lyrics_exact_match: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spotify_api_base: DEFAULT_SPOTIFY_API_BASE.to_string(),
            spotify_token_url: DEFAULT_SPOTIFY_TOKEN_URL.to_string(),
            genius_api_search_url: DEFAULT_GENIUS_API_SEARCH_URL.to_string(),
            genius_base_url: DEFAULT_GENIUS_BASE_URL.to_string(),
            output_dir: PathBuf::from("crawler-output"),
            genre: "hip-hop".to_string(),
            years: default_years(),
            market: "US".to_string(),
            page_size: 50,
            max_concurrent_requests: 8,
            request_delay_ms: 10,
            request_timeout_seconds: 10,
            max_retries: default_max_retries(),
            lyrics_exact_match: false,
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Try to load .env file if it exists
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        let config_file = match config_path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::default_config_path().ok(),
        };

        if let Some(ref config_file) = config_file {
            if config_file.exists() {
                debug!("Loading configuration from {}", config_file.display());
                let content = fs::read_to_string(config_file)?;
                config = toml::from_str(&content)?;
            } else if config_path.is_some() {
                return Err(CrawlError::Validation(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        } else {
            warn!("ProjectDirs unavailable; using built-in configuration defaults");
        }

        // Environment variables have the highest priority
        config.load_from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply `TRACKCRAWL_*` overrides
    fn load_from_env(&mut self) -> Result<()> {
        if let Some(url) = EnvParser::parse_url(EnvVars::SPOTIFY_API_BASE)? {
            self.spotify_api_base = url;
        }

        if let Some(url) = EnvParser::parse_url(EnvVars::SPOTIFY_TOKEN_URL)? {
            self.spotify_token_url = url;
        }

        if let Some(url) = EnvParser::parse_url(EnvVars::GENIUS_API_SEARCH_URL)? {
            self.genius_api_search_url = url;
        }

        if let Some(url) = EnvParser::parse_url(EnvVars::GENIUS_BASE_URL)? {
            self.genius_base_url = url;
        }

        if let Some(dir) = EnvParser::parse_path(EnvVars::OUTPUT_DIR)? {
            self.output_dir = dir;
        }

        if let Some(genre) = EnvParser::parse_string(EnvVars::GENRE, None)? {
            self.genre = genre;
        }

        if let Some(years) = EnvParser::parse_list(EnvVars::YEARS)? {
            self.years = years;
        }

        let market_check: &dyn Fn(&str) -> Result<()> = &ConfigValidator::validate_market;
        if let Some(market) = EnvParser::parse_string(EnvVars::MARKET, Some(market_check))? {
            self.market = market;
        }

        if let Some(size) = EnvParser::parse_u64(EnvVars::PAGE_SIZE, 1, 50)? {
            self.page_size = size as u32;
        }

        if let Some(limit) = EnvParser::parse_usize(EnvVars::MAX_CONCURRENT_REQUESTS, 1, 64)? {
            self.max_concurrent_requests = limit;
        }

        if let Some(delay) = EnvParser::parse_u64(EnvVars::REQUEST_DELAY_MS, 0, 60_000)? {
            self.request_delay_ms = delay;
        }

        if let Some(timeout) = EnvParser::parse_u64(EnvVars::REQUEST_TIMEOUT_SECONDS, 1, 300)? {
            self.request_timeout_seconds = timeout;
        }

        if let Some(retries) = EnvParser::parse_u64(EnvVars::MAX_RETRIES, 1, 10)? {
            self.max_retries = retries as u32;
        }

        if let Some(exact) = EnvParser::parse_bool(EnvVars::LYRICS_EXACT_MATCH)? {
            self.lyrics_exact_match = exact;
        }

        Ok(())
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_url(&self.spotify_api_base, "catalog API")?;
        ConfigValidator::validate_url(&self.spotify_token_url, "token endpoint")?;
        ConfigValidator::validate_url(&self.genius_api_search_url, "lyrics search")?;
        ConfigValidator::validate_url(&self.genius_base_url, "lyrics base")?;
        ConfigValidator::validate_non_empty(&self.genre, "genre")?;
        ConfigValidator::validate_years(&self.years)?;
        ConfigValidator::validate_market(&self.market)?;
        ConfigValidator::validate_range(self.page_size, 1, 50, "page size")?;
        ConfigValidator::validate_range(
            self.max_concurrent_requests,
            1,
            64,
            "max concurrent requests",
        )?;
        ConfigValidator::validate_range(self.request_delay_ms, 0, 60_000, "request delay")?;
        ConfigValidator::validate_range(
            self.request_timeout_seconds,
            1,
            300,
            "request timeout seconds",
        )?;
        ConfigValidator::validate_range(self.max_retries, 1, 10, "max retries")?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn default_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("net", "trackcrawl", "trackcrawl-cli")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Self::default_config_path()
    }
}
