use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::core::models::{Page, Track};
use crate::error::{FileSystemError, Result};

/// Characters that are illegal in file names on at least one platform,
/// with the token each one is replaced by.
pub const FILENAME_SUBSTITUTIONS: [(char, &str); 9] = [
    ('"', "((dquote))"),
    ('*', "((asterisk))"),
    ('<', "((lt))"),
    ('>', "((gt))"),
    ('?', "((q))"),
    ('\\', "((bslash))"),
    ('/', "((fslash))"),
    ('|', "((pipe))"),
    (':', "((colon))"),
];

/// Whether a crawl writes one file per page or one file per track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputUnit {
    Page,
    Track,
}

pub fn sanitize_filename(identity: &str) -> String {
    let mut sanitized = String::with_capacity(identity.len());
    for c in identity.chars() {
        match FILENAME_SUBSTITUTIONS.iter().find(|(reserved, _)| *reserved == c) {
            Some((_, token)) => sanitized.push_str(token),
            None => sanitized.push(c),
        }
    }
    sanitized
}

/// The query-string part of a page `href`, or the whole `href` when it has none
pub fn page_identity(href: &str) -> String {
    Url::parse(href)
        .ok()
        .and_then(|url| url.query().filter(|q| !q.is_empty()).map(str::to_string))
        .unwrap_or_else(|| href.to_string())
}

pub fn track_identity(track: &Track) -> String {
    match &track.pipeline_identifier {
        Some(identifier) => format!("{}-{}", identifier, track.id),
        None => track.id.clone(),
    }
}

pub struct OutputPersister {
    output_dir: PathBuf,
}

impl OutputPersister {
    /// Create the output directory if it does not exist yet.
    pub async fn prepare(output_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| FileSystemError::CreateDir {
                path: output_dir.to_path_buf(),
                source,
            })?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, identity: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", sanitize_filename(identity)))
    }

    /// Write the page's track list, replacing any previous file.
    pub async fn write_page(&self, page: &Page) -> Result<PathBuf> {
        self.write_json(&page_identity(&page.href), &page.tracks).await
    }

    pub async fn write_track(&self, track: &Track) -> Result<PathBuf> {
        self.write_json(&track_identity(track), track).await
    }

    async fn write_json<T>(&self, identity: &str, record: &T) -> Result<PathBuf>
    where
        T: Serialize + ?Sized,
    {
        let path = self.path_for(identity);
        let content = serde_json::to_vec_pretty(record)
            .map_err(|e| anyhow::anyhow!("Failed to serialize {}: {}", identity, e))?;

        tokio::fs::write(&path, content)
            .await
            .map_err(|source| FileSystemError::Write {
                path: path.clone(),
                source,
            })?;

        debug!("Wrote {}", path.display());
        Ok(path)
    }
}
