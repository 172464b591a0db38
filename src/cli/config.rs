use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::config::env::EnvParser;
use crate::config::Config as AppConfig;
use crate::error::{ConfigError, CrawlError, Result};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show configuration file path
    Path,

    /// Reset configuration to defaults
    Reset,

    /// List all available configuration keys
    Keys,
}

const CONFIG_KEYS: &[(&str, &str)] = &[
    ("spotify_api_base", "Catalog search API base URL"),
    ("spotify_token_url", "Catalog OAuth2 token endpoint"),
    ("genius_api_search_url", "Lyrics search endpoint"),
    ("genius_base_url", "Base URL for lyrics pages"),
    ("output_dir", "Directory receiving JSON output"),
    ("genre", "Genre filter for seed queries"),
    ("years", "Comma-separated release years"),
    ("market", "Two-letter market code"),
    ("page_size", "Results per page (1-50)"),
    ("max_concurrent_requests", "Requests in flight at once (1-64)"),
    ("request_delay_ms", "Delay before each request"),
    ("request_timeout_seconds", "Per-request timeout"),
    ("max_retries", "Attempts per request on transient failures"),
    ("lyrics_exact_match", "Require title and artist to match lyrics hits"),
];

pub async fn execute(
    args: ConfigArgs,
    config: &AppConfig,
    config_file: Option<&str>,
) -> Result<()> {
    let config_path = match config_file {
        Some(path) => PathBuf::from(path),
        None => AppConfig::config_path()?,
    };

    match args.command {
        ConfigCommands::Show => {
            println!("Current configuration:");
            for (key, _) in CONFIG_KEYS {
                if let Some(value) = config_value(config, key) {
                    println!("  {}: {}", key, value);
                }
            }

            let overrides = EnvParser::get_all_trackcrawl_vars();
            if !overrides.is_empty() {
                println!("\nEnvironment overrides:");
                for (name, value) in overrides {
                    println!("  {}={}", name, value);
                }
            }
        }

        ConfigCommands::Set { key, value } => {
            let mut config = config.clone();
            set_config_value(&mut config, &key, &value)?;
            config.validate()?;
            config.save(&config_path)?;
            println!("Configuration updated: {} = {}", key, value);
        }

        ConfigCommands::Get { key } => {
            let value = config_value(config, &key).ok_or_else(|| {
                CrawlError::Validation(format!("Unknown configuration key: {}", key))
            })?;
            println!("{}", value);
        }

        ConfigCommands::Path => {
            println!("{}", config_path.display());
        }

        ConfigCommands::Reset => {
            AppConfig::default().save(&config_path)?;
            println!("✅ Configuration reset to defaults");
            println!("📁 Config file: {}", config_path.display());
        }

        ConfigCommands::Keys => {
            println!("Available configuration keys:");
            for (key, description) in CONFIG_KEYS {
                println!("  {:<26} - {}", key, description);
            }
            println!("\nUsage:");
            println!("  trackcrawl config get <key>");
            println!("  trackcrawl config set <key> <value>");
        }
    }

    Ok(())
}

fn config_value(config: &AppConfig, key: &str) -> Option<String> {
    let value = match key {
        "spotify_api_base" => config.spotify_api_base.clone(),
        "spotify_token_url" => config.spotify_token_url.clone(),
        "genius_api_search_url" => config.genius_api_search_url.clone(),
        "genius_base_url" => config.genius_base_url.clone(),
        "output_dir" => config.output_dir.display().to_string(),
        "genre" => config.genre.clone(),
        "years" => config.years.join(","),
        "market" => config.market.clone(),
        "page_size" => config.page_size.to_string(),
        "max_concurrent_requests" => config.max_concurrent_requests.to_string(),
        "request_delay_ms" => config.request_delay_ms.to_string(),
        "request_timeout_seconds" => config.request_timeout_seconds.to_string(),
        "max_retries" => config.max_retries.to_string(),
        "lyrics_exact_match" => config.lyrics_exact_match.to_string(),
        _ => return None,
    };
    Some(value)
}

fn set_config_value(config: &mut AppConfig, key: &str, value: &str) -> Result<()> {
    fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
        value.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: key.to_string(),
                value: value.to_string(),
            }
            .into()
        })
    }

    match key {
        "spotify_api_base" => config.spotify_api_base = value.to_string(),
        "spotify_token_url" => config.spotify_token_url = value.to_string(),
        "genius_api_search_url" => config.genius_api_search_url = value.to_string(),
        "genius_base_url" => config.genius_base_url = value.to_string(),
        "output_dir" => config.output_dir = PathBuf::from(value),
        "genre" => config.genre = value.to_string(),
        "years" => {
            config.years = value
                .split(',')
                .map(|year| year.trim().to_string())
                .filter(|year| !year.is_empty())
                .collect();
        }
        "market" => config.market = value.to_string(),
        "page_size" => config.page_size = parse(key, value)?,
        "max_concurrent_requests" => config.max_concurrent_requests = parse(key, value)?,
        "request_delay_ms" => config.request_delay_ms = parse(key, value)?,
        "request_timeout_seconds" => config.request_timeout_seconds = parse(key, value)?,
        "max_retries" => config.max_retries = parse(key, value)?,
        "lyrics_exact_match" => config.lyrics_exact_match = parse(key, value)?,
        _ => {
            return Err(CrawlError::Validation(format!(
                "Unknown configuration key: {}",
                key
            )))
        }
    }
    Ok(())
}
