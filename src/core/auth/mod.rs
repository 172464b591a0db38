//! Bearer-token management for the two API providers
//!
//! - `credentials`: where client ids, secrets and static tokens come from
//! - `token`: the refreshing client-credentials token and the static token

pub mod credentials;
pub mod token;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

pub use credentials::ClientCredentials;
pub use token::{ClientCredentialsToken, StaticToken};

/// Authorization header, optionally paired with a content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    authorization: String,
    content_type: Option<String>,
}

impl AuthHeader {
    pub fn bearer(token: &str) -> Self {
        Self {
            authorization: format!("Bearer {}", token),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    pub fn into_headers(self) -> Vec<(String, String)> {
        let mut headers = vec![("Authorization".to_string(), self.authorization)];
        if let Some(content_type) = self.content_type {
            headers.push(("Content-Type".to_string(), content_type));
        }
        headers
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_authorized_header(&self) -> Result<AuthHeader>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_header_into_headers() {
        let headers = AuthHeader::bearer("abc")
            .with_content_type("application/json")
            .into_headers();

        assert_eq!(
            headers,
            vec![
                ("Authorization".to_string(), "Bearer abc".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ]
        );
    }
}
