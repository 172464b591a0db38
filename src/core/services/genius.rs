use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::core::auth::TokenProvider;
use crate::core::engine::{CrawlEngine, HttpRequest};
use crate::core::models::{Candidate, LyricsMatch, Track};
use crate::error::{CrawlError, Result};

const LYRICS_CONTAINER_SELECTOR: &str = r#"div[data-lyrics-container="true"]"#;

#[derive(Deserialize)]
struct SearchEnvelope {
    response: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    result: RawResult,
}

#[derive(Deserialize, Default)]
struct RawResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist_names: String,
    #[serde(default)]
    path: String,
}

impl From<RawHit> for Candidate {
    fn from(hit: RawHit) -> Self {
        Candidate {
            kind: hit.kind,
            title: hit.result.title,
            artist_names: hit.result.artist_names,
            path: hit.result.path,
        }
    }
}

/// Which search hit is accepted as the lyrics for a track.
///
/// Comparison is plain case-folded substring containment; punctuation and
/// diacritics are not normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchPolicy {
    pub exact: bool,
}

impl MatchPolicy {
    pub fn select<'a>(
        &self,
        candidates: &'a [Candidate],
        song_name: &str,
        artist_name: &str,
    ) -> Option<&'a Candidate> {
        let song_name = song_name.to_lowercase();
        let artist_name = artist_name.to_lowercase();

        candidates.iter().filter(|c| c.is_song()).find(|c| {
            !self.exact
                || (c.artist_names.to_lowercase().contains(&artist_name)
                    && c.title.to_lowercase().contains(&song_name))
        })
    }
}

#[derive(Clone)]
pub struct GeniusLyricsMatcher {
    engine: Arc<CrawlEngine>,
    token: Arc<dyn TokenProvider>,
    search_url: String,
    base_url: String,
    policy: MatchPolicy,
}

impl GeniusLyricsMatcher {
    pub fn new(
        engine: Arc<CrawlEngine>,
        token: Arc<dyn TokenProvider>,
        search_url: &str,
        base_url: &str,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            engine,
            token,
            search_url: search_url.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }

    pub fn from_config(
        engine: Arc<CrawlEngine>,
        token: Arc<dyn TokenProvider>,
        config: &Config,
    ) -> Self {
        Self::new(
            engine,
            token,
            &config.genius_api_search_url,
            &config.genius_base_url,
            MatchPolicy {
                exact: config.lyrics_exact_match,
            },
        )
    }

    pub fn search_request_url(&self, song_name: &str, artist_name: &str) -> Result<String> {
        let query = format!("{} {}", song_name, artist_name);
        Url::parse_with_params(&self.search_url, &[("q", query.as_str())])
            .map(|url| url.to_string())
            .map_err(|e| {
                CrawlError::Validation(format!(
                    "Invalid lyrics search URL {}: {}",
                    self.search_url, e
                ))
            })
    }

    pub async fn search_candidates(
        &self,
        song_name: &str,
        artist_name: &str,
    ) -> Result<Vec<Candidate>> {
        let url = self.search_request_url(song_name, artist_name)?;
        let header = self.token.get_authorized_header().await?;
        let request = HttpRequest::get(url).with_headers(header.into_headers());

        let response = self.engine.fetch(request).await?;
        let envelope: SearchEnvelope = response.json()?;
        Ok(envelope.response.hits.into_iter().map(Candidate::from).collect())
    }

    pub async fn fetch_lyrics(&self, candidate: &Candidate) -> Result<String> {
        let url = format!("{}{}", self.base_url, candidate.path);
        let response = self.engine.fetch(HttpRequest::get(url)).await?;
        Ok(extract_lyrics(&response.body))
    }

    /// Search, select and fetch. `Ok(None)` means no candidate was accepted.
    pub async fn find_lyrics(
        &self,
        song_name: &str,
        artist_name: &str,
    ) -> Result<Option<LyricsMatch>> {
        let candidates = self.search_candidates(song_name, artist_name).await?;

        let Some(candidate) = self.policy.select(&candidates, song_name, artist_name) else {
            return Ok(None);
        };

        debug!("Matched {} by {} to {}", song_name, artist_name, candidate.path);
        let lyrics = self.fetch_lyrics(candidate).await?;
        Ok(Some(LyricsMatch {
            lyrics,
            song_name: candidate.title.clone(),
            artist_name: candidate.artist_names.clone(),
        }))
    }

    /// Attach lyrics to a track, falling back to the not-found sentinel.
    ///
    /// Only cancellation is returned as an error; the track is then not
    /// meant to be persisted.
    pub async fn enrich(&self, mut track: Track) -> Result<Track> {
        let song_name = track.name.clone();
        let artist_name = track.first_artist().to_string();
        info!("Searching lyrics for song: {} by artist: {}", song_name, artist_name);

        match self.find_lyrics(&song_name, &artist_name).await {
            Ok(Some(found)) => track.attach_lyrics(found),
            Ok(None) => {
                info!("Lyrics not found for song: {}\tartist: {}", song_name, artist_name);
                track.mark_lyrics_not_found();
            }
            Err(CrawlError::Cancelled) => return Err(CrawlError::Cancelled),
            Err(e) => {
                warn!("Lyrics lookup failed for {} by {}: {}", song_name, artist_name, e);
                track.mark_lyrics_not_found();
            }
        }

        Ok(track)
    }
}

/// Text of every lyrics container in document order, concatenated with no
/// separator between fragments or containers.
pub fn extract_lyrics(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(LYRICS_CONTAINER_SELECTOR).expect("valid lyrics container selector");

    document
        .select(&selector)
        .flat_map(|container| container.text())
        .collect()
}
