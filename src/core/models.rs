use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CrawlError, Result};

/// Placeholder stored in every lyrics field when no lyrics could be matched
pub const LYRICS_NOT_FOUND: &str = "<LYRICS-NOT-FOUND>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A catalog track.
///
/// Only the fields the crawl relies on are typed; everything else the
/// provider sends is carried through `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<Artist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_song_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_artist_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Track {
    /// Build a track from a raw catalog item, rejecting items the crawl
    /// cannot match or name.
    pub fn from_value(value: Value) -> Result<Self> {
        let track: Track = serde_json::from_value(value)
            .map_err(|e| CrawlError::invalid_response(format!("malformed track item: {}", e)))?;

        if track.artists.is_empty() {
            return Err(CrawlError::invalid_response(format!(
                "track {} has no artists",
                track.id
            )));
        }

        Ok(track)
    }

    pub fn first_artist(&self) -> &str {
        self.artists.first().map(|a| a.name.as_str()).unwrap_or_default()
    }

    pub fn attach_lyrics(&mut self, found: LyricsMatch) {
        self.lyrics = Some(found.lyrics);
        self.lyrics_song_name = Some(found.song_name);
        self.lyrics_artist_name = Some(found.artist_name);
    }

    pub fn mark_lyrics_not_found(&mut self) {
        self.lyrics = Some(LYRICS_NOT_FOUND.to_string());
        self.lyrics_song_name = Some(LYRICS_NOT_FOUND.to_string());
        self.lyrics_artist_name = Some(LYRICS_NOT_FOUND.to_string());
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub href: String,
    pub tracks: Vec<Track>,
    pub next: Option<String>,
}

/// A search hit from the lyrics provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: String,
    pub title: String,
    pub artist_names: String,
    pub path: String,
}

impl Candidate {
    pub fn is_song(&self) -> bool {
        self.kind == "song"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsMatch {
    pub lyrics: String,
    pub song_name: String,
    pub artist_name: String,
}
