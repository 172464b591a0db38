use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::core::auth::{AuthHeader, ClientCredentials, Clock, SystemClock, TokenProvider};
use crate::core::engine::{HttpFetcher, HttpRequest};
use crate::error::{NetworkError, Result};

/// Seconds shaved off every grant so a token is never used right at expiry
pub const EXPIRY_MARGIN_SECONDS: i64 = 30;

#[derive(Debug, Clone)]
struct CachedToken {
    bearer_value: String,
    valid_until: DateTime<Utc>,
}

#[derive(Deserialize)]
struct GrantResponse {
    access_token: String,
    expires_in: i64,
}

/// Token obtained through the OAuth2 client-credentials grant.
///
/// Refreshed lazily: only a call that observes the clock past `valid_until`
/// performs a new grant. Concurrent callers that both observe an expired
/// token will both refresh; the last grant to finish is kept.
pub struct ClientCredentialsToken {
    credentials: ClientCredentials,
    token_url: String,
    fetcher: Arc<dyn HttpFetcher>,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<CachedToken>>,
    grants: AtomicUsize,
}

impl ClientCredentialsToken {
    pub fn new(
        credentials: ClientCredentials,
        token_url: &str,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Self {
        Self {
            credentials,
            token_url: token_url.to_string(),
            fetcher,
            clock: Arc::new(SystemClock),
            cached: RwLock::new(None),
            grants: AtomicUsize::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of grant exchanges attempted so far
    pub fn grant_count(&self) -> usize {
        self.grants.load(Ordering::Relaxed)
    }

    /// Perform a grant exchange now, replacing any cached token.
    pub async fn refresh_token(&self) -> Result<()> {
        let token = self.request_grant().await?;
        info!(
            "Obtained access token for client {} valid until {}",
            self.credentials.client_id(),
            token.valid_until
        );
        *self.cached.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
        Ok(())
    }

    fn current_token(&self) -> Option<String> {
        let now = self.clock.now();
        let cached = self.cached.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        cached
            .as_ref()
            .filter(|token| now <= token.valid_until)
            .map(|token| token.bearer_value.clone())
    }

    async fn request_grant(&self) -> Result<CachedToken> {
        let requested_at = self.clock.now();
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .finish();

        let request = HttpRequest::post_form(&self.token_url, body)
            .with_header("Authorization", self.credentials.basic_authorization())
            .with_header("Content-Type", "application/x-www-form-urlencoded");

        self.grants.fetch_add(1, Ordering::Relaxed);
        debug!("Requesting client-credentials grant from {}", self.token_url);
        let response = self.fetcher.execute(request).await?;

        if !response.is_success() {
            return Err(NetworkError::TokenGrant {
                reason: format!("{} returned status {}", self.token_url, response.status),
            }
            .into());
        }

        let grant: GrantResponse =
            serde_json::from_str(&response.body).map_err(|e| NetworkError::TokenGrant {
                reason: format!("malformed grant response: {}", e),
            })?;

        let valid_until = grant
            .expires_in
            .checked_sub(EXPIRY_MARGIN_SECONDS)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| requested_at.checked_add_signed(lifetime))
            .ok_or_else(|| NetworkError::TokenGrant {
                reason: format!("expires_in out of range: {}", grant.expires_in),
            })?;

        Ok(CachedToken {
            bearer_value: grant.access_token,
            valid_until,
        })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsToken {
    async fn get_authorized_header(&self) -> Result<AuthHeader> {
        if let Some(token) = self.current_token() {
            return Ok(AuthHeader::bearer(&token));
        }

        debug!("Access token missing or expired, refreshing");
        let token = self.request_grant().await?;
        let header = AuthHeader::bearer(&token.bearer_value);
        *self.cached.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
        Ok(header)
    }
}

/// Long-lived token issued out of band; never refreshed
pub struct StaticToken {
    token: String,
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken").field("token", &"<redacted>").finish()
    }
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn get_authorized_header(&self) -> Result<AuthHeader> {
        Ok(AuthHeader::bearer(&self.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::HttpMethod;
    use crate::core::testing::{FakeFetcher, ManualClock};
    use crate::error::CrawlError;
    use serde_json::json;

    const TOKEN_URL: &str = "https://accounts.test/api/token";

    fn token_with_clock(
        fetcher: Arc<FakeFetcher>,
        clock: Arc<ManualClock>,
    ) -> ClientCredentialsToken {
        ClientCredentialsToken::new(ClientCredentials::new("id", "secret"), TOKEN_URL, fetcher)
            .with_clock(clock)
    }

    #[tokio::test]
    async fn test_single_grant_within_validity_window() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.route(TOKEN_URL, 200, r#"{"access_token": "first", "expires_in": 3600}"#);
        let clock = Arc::new(ManualClock::new());
        let token = token_with_clock(fetcher.clone(), clock.clone());

        for _ in 0..5 {
            let header = token.get_authorized_header().await.unwrap();
            assert_eq!(header.authorization(), "Bearer first");
            clock.advance_seconds(600);
        }

        // 3000s elapsed, still within 3600 - 30
        assert_eq!(token.grant_count(), 1);
        assert_eq!(fetcher.count_for(TOKEN_URL), 1);
    }

    #[tokio::test]
    async fn test_refreshes_once_after_window_elapses() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.route(TOKEN_URL, 200, r#"{"access_token": "first", "expires_in": 100}"#);
        fetcher.route(TOKEN_URL, 200, r#"{"access_token": "second", "expires_in": 100}"#);
        let clock = Arc::new(ManualClock::new());
        let token = token_with_clock(fetcher.clone(), clock.clone());

        assert_eq!(token.get_authorized_header().await.unwrap().authorization(), "Bearer first");

        // exactly at valid_until the token is still usable
        clock.advance_seconds(70);
        assert_eq!(token.get_authorized_header().await.unwrap().authorization(), "Bearer first");
        assert_eq!(token.grant_count(), 1);

        clock.advance_seconds(1);
        assert_eq!(token.get_authorized_header().await.unwrap().authorization(), "Bearer second");
        assert_eq!(token.get_authorized_header().await.unwrap().authorization(), "Bearer second");
        assert_eq!(token.grant_count(), 2);
    }

    #[tokio::test]
    async fn test_grant_request_shape() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.route(
            TOKEN_URL,
            200,
            r#"{"access_token": "abc", "expires_in": 3600, "token_type": "Bearer"}"#,
        );
        let token = token_with_clock(fetcher.clone(), Arc::new(ManualClock::new()));

        token.refresh_token().await.unwrap();

        let requests = fetcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].body.as_deref(), Some("grant_type=client_credentials"));
        assert_eq!(requests[0].header("Authorization"), Some("Basic aWQ6c2VjcmV0"));
    }

    #[tokio::test]
    async fn test_failed_grant_propagates() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.route(TOKEN_URL, 401, r#"{"error": "invalid_client"}"#);
        let token = token_with_clock(fetcher.clone(), Arc::new(ManualClock::new()));

        let err = token.get_authorized_header().await.unwrap_err();

        assert!(matches!(err, CrawlError::Network(NetworkError::TokenGrant { .. })));
    }

    #[tokio::test]
    async fn test_malformed_grant_is_not_cached() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.route(TOKEN_URL, 200, r#"{"token": "wrong-shape"}"#);
        fetcher.route(TOKEN_URL, 200, r#"{"access_token": "good", "expires_in": 3600}"#);
        let token = token_with_clock(fetcher.clone(), Arc::new(ManualClock::new()));

        assert!(token.get_authorized_header().await.is_err());
        assert_eq!(token.get_authorized_header().await.unwrap().authorization(), "Bearer good");
        assert_eq!(token.grant_count(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_is_an_error() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.route(TOKEN_URL, 200, r#"{"access_token": "a", "expires_in": 100000000000000000}"#);
        let minimum = json!({"access_token": "b", "expires_in": i64::MIN}).to_string();
        fetcher.route(TOKEN_URL, 200, &minimum);
        fetcher.route(TOKEN_URL, 200, r#"{"access_token": "good", "expires_in": 3600}"#);
        let token = token_with_clock(fetcher.clone(), Arc::new(ManualClock::new()));

        let err = token.get_authorized_header().await.unwrap_err();
        assert!(err.to_string().contains("expires_in out of range"), "{}", err);
        assert!(token.get_authorized_header().await.is_err());
        assert_eq!(token.get_authorized_header().await.unwrap().authorization(), "Bearer good");
        assert_eq!(token.grant_count(), 3);
    }

    #[tokio::test]
    async fn test_static_token_header_is_constant() {
        let token = StaticToken::new("static");

        let first = token.get_authorized_header().await.unwrap();
        let second = token.get_authorized_header().await.unwrap();

        assert_eq!(first.authorization(), "Bearer static");
        assert_eq!(first, second);
        assert!(!format!("{:?}", token).contains("static\""));
    }
}
