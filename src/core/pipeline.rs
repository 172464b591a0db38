//! Ties the pager, the lyrics matcher and the persister together.
//!
//! Pages from every seed query are merged as they arrive and processed
//! concurrently. With lyrics enabled each track is matched independently;
//! all network traffic still flows through the shared [`CrawlEngine`], so
//! the global request ceiling holds.
//!
//! [`CrawlEngine`]: crate::core::engine::CrawlEngine

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use crate::core::files::output::{OutputPersister, OutputUnit};
use crate::core::models::{Page, Track, LYRICS_NOT_FOUND};
use crate::core::services::genius::GeniusLyricsMatcher;
use crate::core::services::spotify::{SearchFilter, SpotifySearchPager};
use crate::error::Result;
use crate::utils::progress::ProgressMessages;

#[derive(Debug, Default)]
struct CrawlStats {
    pages: AtomicUsize,
    tracks: AtomicUsize,
    files_written: AtomicUsize,
    write_failures: AtomicUsize,
    lyrics_found: AtomicUsize,
    lyrics_missing: AtomicUsize,
    discarded: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages: usize,
    pub tracks: usize,
    pub files_written: usize,
    pub write_failures: usize,
    pub lyrics_found: usize,
    pub lyrics_missing: usize,
    pub discarded: usize,
}

impl CrawlStats {
    fn snapshot(&self) -> CrawlSummary {
        CrawlSummary {
            pages: self.pages.load(Ordering::Relaxed),
            tracks: self.tracks.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            lyrics_found: self.lyrics_found.load(Ordering::Relaxed),
            lyrics_missing: self.lyrics_missing.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

pub struct CrawlPipeline {
    pager: SpotifySearchPager,
    matcher: Option<GeniusLyricsMatcher>,
    persister: OutputPersister,
    output_unit: OutputUnit,
    concurrency: usize,
    stats: CrawlStats,
    progress: Option<ProgressBar>,
}

impl CrawlPipeline {
    pub fn new(
        pager: SpotifySearchPager,
        persister: OutputPersister,
        output_unit: OutputUnit,
        concurrency: usize,
    ) -> Self {
        Self {
            pager,
            matcher: None,
            persister,
            output_unit,
            concurrency: concurrency.max(1),
            stats: CrawlStats::default(),
            progress: None,
        }
    }

    pub fn with_lyrics(mut self, matcher: GeniusLyricsMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Crawl every seed query of `filter` to exhaustion.
    pub async fn run(&self, filter: &SearchFilter) -> Result<CrawlSummary> {
        let cursors = self.pager.seed_cursors(filter)?;
        info!(
            "Crawling {} seed queries, writing one file per {}",
            cursors.len(),
            match self.output_unit {
                OutputUnit::Page => "page",
                OutputUnit::Track => "track",
            }
        );

        let pages = stream::select_all(cursors.into_iter().map(|cursor| self.pager.pages(cursor)));
        pages
            .for_each_concurrent(self.concurrency, |page| self.process_page(page))
            .await;

        Ok(self.stats.snapshot())
    }

    async fn process_page(&self, page: Page) {
        if self.pager.is_cancelled() {
            debug!("Discarding page {}: crawl cancelled", page.href);
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.stats.pages.fetch_add(1, Ordering::Relaxed);
        self.stats.tracks.fetch_add(page.tracks.len(), Ordering::Relaxed);
        debug!("Processing page {} ({} tracks)", page.href, page.tracks.len());

        match self.output_unit {
            OutputUnit::Page => self.process_page_unit(page).await,
            OutputUnit::Track => self.process_track_units(page).await,
        }

        self.report_progress();
    }

    async fn process_page_unit(&self, mut page: Page) {
        if self.matcher.is_some() {
            let tracks = std::mem::take(&mut page.tracks);
            let enriched: Vec<Result<Track>> = stream::iter(tracks)
                .map(|track| self.enrich(track))
                .buffered(self.concurrency)
                .collect()
                .await;

            match enriched.into_iter().collect::<Result<Vec<Track>>>() {
                Ok(tracks) => page.tracks = tracks,
                Err(e) => {
                    debug!("Discarding page {}: {}", page.href, e);
                    self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            }
        }

        if self.pager.is_cancelled() {
            debug!("Discarding page {}: crawl cancelled during enrichment", page.href);
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match self.persister.write_page(&page).await {
            Ok(path) => {
                self.stats.files_written.fetch_add(1, Ordering::Relaxed);
                info!("Page {} written to: {}", page.href, path.display());
            }
            Err(e) => {
                self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to write page {}: {}", page.href, e);
            }
        }
    }

    async fn process_track_units(&self, page: Page) {
        stream::iter(page.tracks)
            .for_each_concurrent(self.concurrency, |track| async move {
                match self.enrich(track).await {
                    Ok(_) if self.pager.is_cancelled() => {
                        self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(track) => self.persist_track(&track).await,
                    Err(e) => {
                        debug!("Discarding track: {}", e);
                        self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
            .await;
    }

    async fn enrich(&self, track: Track) -> Result<Track> {
        let Some(matcher) = &self.matcher else {
            return Ok(track);
        };

        let track = matcher.enrich(track).await?;
        if track.lyrics.as_deref() == Some(LYRICS_NOT_FOUND) {
            self.stats.lyrics_missing.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.lyrics_found.fetch_add(1, Ordering::Relaxed);
        }
        Ok(track)
    }

    async fn persist_track(&self, track: &Track) {
        match self.persister.write_track(track).await {
            Ok(path) => {
                self.stats.files_written.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Track: {}\tartist: {} written to: {}",
                    track.name,
                    track.first_artist(),
                    path.display()
                );
            }
            Err(e) => {
                self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to write track {}: {}", track.id, e);
            }
        }
        self.report_progress();
    }

    fn report_progress(&self) {
        if let Some(progress) = &self.progress {
            let summary = self.stats.snapshot();
            progress.set_message(ProgressMessages::crawl_status(&summary));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::StaticToken;
    use crate::core::services::genius::MatchPolicy;
    use crate::core::testing::{temp_output_dir, test_engine, FakeFetcher};
    use serde_json::{json, Value};
    use std::path::Path;
    use std::sync::Arc;

    const API_BASE: &str = "https://api.test/v1";
    const SEARCH_URL: &str = "https://api.lyrics.test/search";
    const BASE_URL: &str = "https://lyrics.test";

    fn single_year_filter() -> SearchFilter {
        SearchFilter {
            genre: "hip-hop".to_string(),
            years: vec!["2019".to_string()],
            market: "US".to_string(),
            page_size: 1,
        }
    }

    fn page_body(href: &str, id: &str, name: &str, artist: &str, next: Option<&str>) -> String {
        json!({"tracks": {
            "href": href,
            "items": [{"id": id, "name": name, "artists": [{"name": artist}]}],
            "next": next
        }})
        .to_string()
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Two-page chain for the 2019 seed; returns the page hrefs
    fn route_two_pages(fetcher: &FakeFetcher, pager: &SpotifySearchPager) -> (String, String) {
        let seed = pager.seed_cursors(&single_year_filter()).unwrap().remove(0);
        let first_href = "https://api.test/v1/search?query=genre%3Ahip-hop+year%3A2019&type=track&offset=0&limit=1";
        let second_href = "https://api.test/v1/search?query=genre%3Ahip-hop+year%3A2019&type=track&offset=1&limit=1";
        let first_body = page_body(first_href, "t1", "Hello", "Adele", Some(second_href));
        fetcher.route(seed.url(), 200, &first_body);
        fetcher.route(second_href, 200, &page_body(second_href, "t2", "Obscure", "Nobody", None));
        (first_href.to_string(), second_href.to_string())
    }

    #[tokio::test]
    async fn test_two_pages_without_lyrics_produce_two_page_files() {
        let fetcher = Arc::new(FakeFetcher::new());
        let engine = test_engine(fetcher.clone());
        let pager = SpotifySearchPager::new(engine, Arc::new(StaticToken::new("tok")), API_BASE);
        route_two_pages(&fetcher, &pager);
        let dir = temp_output_dir("pipeline-pages");
        let persister = OutputPersister::prepare(&dir).await.unwrap();

        let pipeline = CrawlPipeline::new(pager, persister, OutputUnit::Page, 4);
        let summary = pipeline.run(&single_year_filter()).await.unwrap();

        assert_eq!(summary.pages, 2);
        assert_eq!(summary.files_written, 2);
        assert_eq!(fetcher.requests().len(), 2);
        assert_eq!(
            file_names(&dir),
            vec![
                "query=genre%3Ahip-hop+year%3A2019&type=track&offset=0&limit=1.json".to_string(),
                "query=genre%3Ahip-hop+year%3A2019&type=track&offset=1&limit=1.json".to_string(),
            ]
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_lyrics_enrichment_writes_one_file_per_track() {
        let fetcher = Arc::new(FakeFetcher::new());
        let engine = test_engine(fetcher.clone());
        let pager =
            SpotifySearchPager::new(engine.clone(), Arc::new(StaticToken::new("tok")), API_BASE);
        let (first_href, _) = route_two_pages(&fetcher, &pager);
        let matcher = GeniusLyricsMatcher::new(
            engine,
            Arc::new(StaticToken::new("lyrics")),
            SEARCH_URL,
            BASE_URL,
            MatchPolicy { exact: true },
        );

        let hello_search = matcher.search_request_url("Hello", "Adele").unwrap();
        fetcher.route(
            &hello_search,
            200,
            &json!({"response": {"hits": [
                {"type": "song", "result": {"title": "Hello", "artist_names": "Adele", "path": "/hello"}}
            ]}})
            .to_string(),
        );
        fetcher.route(
            "https://lyrics.test/hello",
            200,
            r#"<div data-lyrics-container="true">Hello, it's me</div>"#,
        );
        let obscure_search = matcher.search_request_url("Obscure", "Nobody").unwrap();
        fetcher.route(&obscure_search, 200, r#"{"response": {"hits": []}}"#);

        let dir = temp_output_dir("pipeline-tracks");
        let persister = OutputPersister::prepare(&dir).await.unwrap();
        let pipeline =
            CrawlPipeline::new(pager, persister, OutputUnit::Track, 4).with_lyrics(matcher);

        let summary = pipeline.run(&single_year_filter()).await.unwrap();

        assert_eq!(summary.files_written, 2);
        assert_eq!(summary.lyrics_found, 1);
        assert_eq!(summary.lyrics_missing, 1);

        let identity = crate::core::files::output::page_identity(&first_href);
        let hello_path = dir.join(format!("{}-t1.json", identity));
        let hello: Value = serde_json::from_slice(&std::fs::read(hello_path).unwrap()).unwrap();
        assert_eq!(hello["lyrics"], "Hello, it's me");
        assert_eq!(hello["pipeline_identifier"], identity.as_str());

        let obscure_name = file_names(&dir)
            .into_iter()
            .find(|name| name.ends_with("-t2.json"))
            .unwrap();
        let obscure_bytes = std::fs::read(dir.join(obscure_name)).unwrap();
        let obscure: Value = serde_json::from_slice(&obscure_bytes).unwrap();
        assert_eq!(obscure["lyrics"], LYRICS_NOT_FOUND);
        assert_eq!(obscure["lyrics_song_name"], LYRICS_NOT_FOUND);
        assert_eq!(obscure["lyrics_artist_name"], LYRICS_NOT_FOUND);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_cancelled_crawl_writes_nothing() {
        let fetcher = Arc::new(FakeFetcher::new());
        let engine = test_engine(fetcher.clone());
        engine.shutdown_signal().request_shutdown();
        let pager = SpotifySearchPager::new(engine, Arc::new(StaticToken::new("tok")), API_BASE);
        route_two_pages(&fetcher, &pager);
        let dir = temp_output_dir("pipeline-cancelled");
        let persister = OutputPersister::prepare(&dir).await.unwrap();

        let pipeline = CrawlPipeline::new(pager, persister, OutputUnit::Page, 4);
        let summary = pipeline.run(&single_year_filter()).await.unwrap();

        assert_eq!(summary, CrawlSummary::default());
        assert!(fetcher.requests().is_empty());
        assert!(file_names(&dir).is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_page_enriched_after_shutdown_is_not_written() {
        let fetcher = Arc::new(FakeFetcher::new());
        let engine = test_engine(fetcher.clone());
        let pager =
            SpotifySearchPager::new(engine.clone(), Arc::new(StaticToken::new("tok")), API_BASE);
        let seed = pager.seed_cursors(&single_year_filter()).unwrap().remove(0);
        let href = "https://api.test/v1/search?query=genre%3Ahip-hop+year%3A2019&offset=0";
        fetcher.route(seed.url(), 200, &page_body(href, "t1", "Hello", "Adele", None));

        let matcher = GeniusLyricsMatcher::new(
            engine.clone(),
            Arc::new(StaticToken::new("lyrics")),
            SEARCH_URL,
            BASE_URL,
            MatchPolicy::default(),
        );
        let search = matcher.search_request_url("Hello", "Adele").unwrap();
        fetcher.route(&search, 200, r#"{"response": {"hits": []}}"#);
        fetcher.shutdown_after(&search, engine.shutdown_signal().clone());

        let dir = temp_output_dir("pipeline-page-cancelled");
        let persister = OutputPersister::prepare(&dir).await.unwrap();
        let pipeline =
            CrawlPipeline::new(pager, persister, OutputUnit::Page, 4).with_lyrics(matcher);

        let summary = pipeline.run(&single_year_filter()).await.unwrap();

        assert_eq!(summary.pages, 1);
        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.files_written, 0);
        assert!(file_names(&dir).is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }
}
