use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::CrawlSummary;

/// Centralized progress bar creation utilities
pub struct ProgressUtils;

impl ProgressUtils {
    /// Create a ticking spinner for an open-ended crawl
    pub fn create_crawl_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("valid spinner template"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(ProgressMessages::STARTING);
        pb
    }
}

/// Common progress bar messages
pub struct ProgressMessages;

impl ProgressMessages {
    pub const STARTING: &'static str = "Starting crawl...";
    pub const COMPLETED: &'static str = "✅ Crawl completed";
    pub const CANCELLED: &'static str = "⚠️ Crawl cancelled";

    pub fn crawl_status(summary: &CrawlSummary) -> String {
        let mut status = format!(
            "📄 {} pages | 🎵 {} tracks | 💾 {} files",
            summary.pages, summary.tracks, summary.files_written
        );
        if summary.lyrics_found + summary.lyrics_missing > 0 {
            status.push_str(&format!(
                " | 📝 {} lyrics, {} missing",
                summary.lyrics_found, summary.lyrics_missing
            ));
        }
        status
    }
}
