use url::Url;
use crate::error::{Result, CrawlError};

/// Centralized configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a URL string
    pub fn validate_url(url: &str, field_name: &str) -> Result<()> {
        Url::parse(url).map_err(|e| {
            CrawlError::Validation(format!("Invalid {} URL '{}': {}", field_name, url, e))
        })?;
        Ok(())
    }

    /// Validate numeric range
    pub fn validate_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(CrawlError::Validation(format!(
                "{} must be between {} and {}, got {}",
                field_name, min, max, value
            )));
        }
        Ok(())
    }

    pub fn validate_non_empty(value: &str, field_name: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(CrawlError::Validation(format!("{} must not be empty", field_name)));
        }
        Ok(())
    }

    /// Years must be present and four-digit
    pub fn validate_years(years: &[String]) -> Result<()> {
        if years.is_empty() {
            return Err(CrawlError::Validation(
                "At least one target year is required".to_string(),
            ));
        }

        for year in years {
            if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
                return Err(CrawlError::Validation(format!(
                    "Year must be a four-digit number, got: {}",
                    year
                )));
            }
        }
        Ok(())
    }

    /// Validate an ISO 3166-1 alpha-2 market code
    pub fn validate_market(market: &str) -> Result<()> {
        if market.len() != 2 || !market.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(CrawlError::Validation(format!(
                "Market must be a two-letter uppercase country code, got: {}",
                market
            )));
        }
        Ok(())
    }
}
