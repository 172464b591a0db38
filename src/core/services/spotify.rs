use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::core::auth::TokenProvider;
use crate::core::engine::{CrawlEngine, HttpRequest};
use crate::core::files::output::page_identity;
use crate::core::models::{Page, Track};
use crate::error::{CrawlError, Result};

const SEARCH_TYPE: &str = "track";

/// Fixed filters every seed query is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub genre: String,
    pub years: Vec<String>,
    pub market: String,
    pub page_size: u32,
}

impl From<&Config> for SearchFilter {
    fn from(config: &Config) -> Self {
        Self {
            genre: config.genre.clone(),
            years: config.years.clone(),
            market: config.market.clone(),
            page_size: config.page_size,
        }
    }
}

/// Resumable position in a paginated result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    url: String,
}

impl PageCursor {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: TrackListing,
}

#[derive(Deserialize)]
struct TrackListing {
    href: String,
    items: Vec<Value>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Clone)]
pub struct SpotifySearchPager {
    engine: Arc<CrawlEngine>,
    token: Arc<dyn TokenProvider>,
    api_base: String,
}

impl SpotifySearchPager {
    pub fn new(engine: Arc<CrawlEngine>, token: Arc<dyn TokenProvider>, api_base: &str) -> Self {
        Self {
            engine,
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.engine.shutdown_signal().is_shutdown_requested()
    }

    /// One starting cursor per target year
    pub fn seed_cursors(&self, filter: &SearchFilter) -> Result<Vec<PageCursor>> {
        let page_size = filter.page_size.to_string();
        let endpoint = format!("{}/search", self.api_base);

        filter
            .years
            .iter()
            .map(|year| {
                let query = format!("genre:{} year:{}", filter.genre, year);
                let url = Url::parse_with_params(
                    &endpoint,
                    &[
                        ("q", query.as_str()),
                        ("type", SEARCH_TYPE),
                        ("market", filter.market.as_str()),
                        ("limit", page_size.as_str()),
                        ("offset", "0"),
                    ],
                )
                .map_err(|e| {
                    CrawlError::Validation(format!("Invalid search URL {}: {}", endpoint, e))
                })?;

                info!("Search URL: {}", url);
                Ok(PageCursor::new(url.to_string()))
            })
            .collect()
    }

    /// Lazily walk a result set starting at `cursor`.
    ///
    /// Each poll fetches at most one page; the chain ends when a page carries
    /// no `next` cursor, or when a page cannot be fetched or parsed.
    pub fn pages(&self, cursor: PageCursor) -> BoxStream<'static, Page> {
        let pager = self.clone();
        stream::unfold(Some(cursor), move |state| {
            let pager = pager.clone();
            async move {
                let cursor = state?;
                match pager.fetch_page(cursor.url()).await {
                    Ok(page) => {
                        let next = page.next.clone().map(PageCursor::new);
                        Some((page, next))
                    }
                    Err(CrawlError::Cancelled) => {
                        debug!("Stopping pagination at {}: crawl cancelled", cursor.url());
                        None
                    }
                    Err(e) => {
                        warn!("Dropping page {}: {}", cursor.url(), e);
                        None
                    }
                }
            }
        })
        .boxed()
    }

    pub async fn fetch_page(&self, url: &str) -> Result<Page> {
        let header = self
            .token
            .get_authorized_header()
            .await?
            .with_content_type("application/json");
        let request = HttpRequest::get(url).with_headers(header.into_headers());

        let response = self.engine.fetch(request).await?;
        let body: SearchResponse = response.json()?;
        Ok(parse_listing(body.tracks))
    }
}

fn parse_listing(listing: TrackListing) -> Page {
    let identifier = page_identity(&listing.href);
    let mut tracks = Vec::with_capacity(listing.items.len());

    for item in listing.items {
        match Track::from_value(item) {
            Ok(mut track) => {
                track.pipeline_identifier = Some(identifier.clone());
                tracks.push(track);
            }
            Err(e) => warn!("Dropping track from {}: {}", listing.href, e),
        }
    }

    debug!("Parsed page {} with {} tracks", listing.href, tracks.len());
    Page {
        href: listing.href,
        tracks,
        next: listing.next,
    }
}
