//! Error handling for the trackcrawl-cli application
//!
//! This module provides a hierarchical error system. Failures inside the
//! crawl pipeline are typed so callers can decide whether they abort a single
//! request, a single record, or the whole process.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("File system error: {0}")]
    FileSystem(#[from] FileSystemError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("API response invalid: {reason}")]
    InvalidResponse { reason: String },

    #[error("Token grant failed: {reason}")]
    TokenGrant { reason: String },
}

#[derive(Error, Debug)]
pub enum FileSystemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error(
        "{message} (set it as an argument, in a credentials file, \
         or in the {variable} environment variable)"
    )]
    Missing { variable: String, message: String },

    #[error("Credentials file {path} does not contain a \"{key}\" attribute")]
    MissingKey { path: PathBuf, key: String },

    #[error("Failed to read credentials file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credentials file {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CrawlError>;

impl From<std::io::Error> for CrawlError {
    fn from(err: std::io::Error) -> Self {
        CrawlError::FileSystem(FileSystemError::Io(err))
    }
}

impl From<reqwest::Error> for CrawlError {
    fn from(err: reqwest::Error) -> Self {
        CrawlError::Network(NetworkError::Http(err))
    }
}

impl From<toml::de::Error> for CrawlError {
    fn from(err: toml::de::Error) -> Self {
        CrawlError::Config(ConfigError::InvalidFormat(err))
    }
}

impl From<toml::ser::Error> for CrawlError {
    fn from(err: toml::ser::Error) -> Self {
        CrawlError::Config(ConfigError::Serialize(err))
    }
}

impl From<tokio::task::JoinError> for CrawlError {
    fn from(err: tokio::task::JoinError) -> Self {
        CrawlError::Internal(err.into())
    }
}

impl CrawlError {
    /// Shorthand for a response that could not be interpreted.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        CrawlError::Network(NetworkError::InvalidResponse {
            reason: reason.into(),
        })
    }
}
