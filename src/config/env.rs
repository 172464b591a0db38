use std::env;
use std::path::PathBuf;
use crate::config::validation::ConfigValidator;
use crate::error::{Result, CrawlError};

/// Environment variable configuration constants
pub struct EnvVars;

impl EnvVars {
    pub const SPOTIFY_API_BASE: &'static str = "TRACKCRAWL_SPOTIFY_API_BASE";
    pub const SPOTIFY_TOKEN_URL: &'static str = "TRACKCRAWL_SPOTIFY_TOKEN_URL";
    pub const GENIUS_API_SEARCH_URL: &'static str = "TRACKCRAWL_GENIUS_API_SEARCH_URL";
    pub const GENIUS_BASE_URL: &'static str = "TRACKCRAWL_GENIUS_BASE_URL";
    pub const OUTPUT_DIR: &'static str = "TRACKCRAWL_OUTPUT_DIR";
    pub const GENRE: &'static str = "TRACKCRAWL_GENRE";
    pub const YEARS: &'static str = "TRACKCRAWL_YEARS";
    pub const MARKET: &'static str = "TRACKCRAWL_MARKET";
    pub const PAGE_SIZE: &'static str = "TRACKCRAWL_PAGE_SIZE";
    pub const MAX_CONCURRENT_REQUESTS: &'static str = "TRACKCRAWL_MAX_CONCURRENT_REQUESTS";
    pub const REQUEST_DELAY_MS: &'static str = "TRACKCRAWL_REQUEST_DELAY_MS";
    pub const REQUEST_TIMEOUT_SECONDS: &'static str = "TRACKCRAWL_REQUEST_TIMEOUT_SECONDS";
    pub const MAX_RETRIES: &'static str = "TRACKCRAWL_MAX_RETRIES";
    pub const LYRICS_EXACT_MATCH: &'static str = "TRACKCRAWL_LYRICS_EXACT_MATCH";

    // Provider credentials
    pub const SPOTIFY_CLIENT_ID: &'static str = "SPOTIFY_CLIENT_ID";
    pub const SPOTIFY_CLIENT_SECRET: &'static str = "SPOTIFY_CLIENT_SECRET";
    pub const GENIUS_TOKEN: &'static str = "GENIUS_TOKEN";
}

/// Environment variable parsing utilities with validation
pub struct EnvParser;

impl EnvParser {
    /// Parse environment variable as string with validation
    pub fn parse_string(
        var_name: &str,
        validator: Option<&dyn Fn(&str) -> Result<()>>,
    ) -> Result<Option<String>> {
        match env::var(var_name) {
            Ok(value) => {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    return Ok(None);
                }

                if let Some(validate_fn) = validator {
                    validate_fn(&trimmed)?;
                }

                Ok(Some(trimmed))
            }
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => {
                Err(CrawlError::Validation(format!(
                    "Environment variable {} contains invalid UTF-8",
                    var_name
                )))
            }
        }
    }

    /// Parse environment variable as an absolute URL
    pub fn parse_url(var_name: &str) -> Result<Option<String>> {
        Self::parse_string(var_name, Some(&|value| ConfigValidator::validate_url(value, var_name)))
    }

    /// Parse environment variable as PathBuf
    pub fn parse_path(var_name: &str) -> Result<Option<PathBuf>> {
        Ok(Self::parse_string(var_name, None)?.map(PathBuf::from))
    }

    /// Parse a comma-separated list, dropping empty entries
    pub fn parse_list(var_name: &str) -> Result<Option<Vec<String>>> {
        Ok(Self::parse_string(var_name, None)?.map(|value| {
            value
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        }))
    }

    /// Parse environment variable as boolean with validation
    pub fn parse_bool(var_name: &str) -> Result<Option<bool>> {
        if let Some(value_str) = Self::parse_string(var_name, None)? {
            match value_str.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(CrawlError::Validation(format!(
                    "Invalid boolean value in {}: '{}'. Use: true/false, 1/0, yes/no, on/off",
                    var_name, value_str
                )))
            }
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as u64 with range validation
    pub fn parse_u64(var_name: &str, min: u64, max: u64) -> Result<Option<u64>> {
        if let Some(value_str) = Self::parse_string(var_name, None)? {
            let value = value_str.parse::<u64>().map_err(|_| {
                CrawlError::Validation(format!(
                    "Invalid number in {}: '{}'. Must be a positive integer",
                    var_name, value_str
                ))
            })?;

            if value < min || value > max {
                return Err(CrawlError::Validation(format!(
                    "Value in {} must be between {} and {}, got {}",
                    var_name, min, max, value
                )));
            }

            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as usize with range validation
    pub fn parse_usize(var_name: &str, min: usize, max: usize) -> Result<Option<usize>> {
        Ok(Self::parse_u64(var_name, min as u64, max as u64)?.map(|value| value as usize))
    }

    /// Get all TRACKCRAWL environment variables for debugging
    pub fn get_all_trackcrawl_vars() -> Vec<(String, String)> {
        env::vars()
            .filter(|(key, _)| key.starts_with("TRACKCRAWL_"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_parse_bool() {
        env::set_var("TEST_TC_BOOL_TRUE", "true");
        env::set_var("TEST_TC_BOOL_FALSE", "off");
        env::set_var("TEST_TC_BOOL_INVALID", "maybe");

        assert_eq!(EnvParser::parse_bool("TEST_TC_BOOL_TRUE").unwrap(), Some(true));
        assert_eq!(EnvParser::parse_bool("TEST_TC_BOOL_FALSE").unwrap(), Some(false));
        assert!(EnvParser::parse_bool("TEST_TC_BOOL_INVALID").is_err());
        assert_eq!(EnvParser::parse_bool("TEST_TC_BOOL_NOT_SET").unwrap(), None);

        env::remove_var("TEST_TC_BOOL_TRUE");
        env::remove_var("TEST_TC_BOOL_FALSE");
        env::remove_var("TEST_TC_BOOL_INVALID");
    }

    #[test]
    fn test_parse_u64() {
        env::set_var("TEST_TC_U64_VALID", "42");
        env::set_var("TEST_TC_U64_OUT_OF_RANGE", "150");
        env::set_var("TEST_TC_U64_INVALID", "not_a_number");

        assert_eq!(EnvParser::parse_u64("TEST_TC_U64_VALID", 1, 100).unwrap(), Some(42));
        assert!(EnvParser::parse_u64("TEST_TC_U64_OUT_OF_RANGE", 1, 100).is_err());
        assert!(EnvParser::parse_u64("TEST_TC_U64_INVALID", 1, 100).is_err());
        assert_eq!(EnvParser::parse_u64("TEST_TC_U64_NOT_SET", 1, 100).unwrap(), None);

        env::remove_var("TEST_TC_U64_VALID");
        env::remove_var("TEST_TC_U64_OUT_OF_RANGE");
        env::remove_var("TEST_TC_U64_INVALID");
    }

    #[test]
    fn test_parse_url_rejects_relative_values() {
        env::set_var("TEST_TC_URL_GOOD", "https://api.test/v1");
        env::set_var("TEST_TC_URL_BAD", "not a url");

        assert_eq!(
            EnvParser::parse_url("TEST_TC_URL_GOOD").unwrap().as_deref(),
            Some("https://api.test/v1")
        );
        assert!(EnvParser::parse_url("TEST_TC_URL_BAD").is_err());
        assert_eq!(EnvParser::parse_url("TEST_TC_URL_NOT_SET").unwrap(), None);

        env::remove_var("TEST_TC_URL_GOOD");
        env::remove_var("TEST_TC_URL_BAD");
    }

    #[test]
    fn test_parse_list() {
        env::set_var("TEST_TC_LIST", " 2019, 2020,,2021 ");

        assert_eq!(
            EnvParser::parse_list("TEST_TC_LIST").unwrap(),
            Some(vec!["2019".to_string(), "2020".to_string(), "2021".to_string()])
        );
        assert_eq!(EnvParser::parse_list("TEST_TC_LIST_NOT_SET").unwrap(), None);

        env::remove_var("TEST_TC_LIST");
    }
}
