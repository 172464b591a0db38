use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::env::EnvVars;
use crate::config::Config;
use crate::core::auth::credentials::resolve_static_token;
use crate::core::auth::{ClientCredentials, ClientCredentialsToken, StaticToken, TokenProvider};
use crate::core::engine::{CrawlEngine, EngineSettings, HttpFetcher, ReqwestFetcher};
use crate::core::files::{OutputPersister, OutputUnit};
use crate::core::services::genius::GeniusLyricsMatcher;
use crate::core::services::spotify::{SearchFilter, SpotifySearchPager};
use crate::core::CrawlPipeline;
use crate::error::Result;
use crate::signal_handler::ShutdownSignal;
use crate::utils::progress::{ProgressMessages, ProgressUtils};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputUnitArg {
    /// Pages without lyrics, tracks with lyrics
    Auto,
    Page,
    Track,
}

#[derive(Args)]
pub struct CrawlArgs {
    /// Enrich every track with lyrics
    #[arg(long)]
    pub lyrics: bool,

    /// Only accept lyrics whose title and artist both match the track
    #[arg(long)]
    pub exact: bool,

    /// Write one file per page or one file per track
    #[arg(long, value_enum, default_value_t = OutputUnitArg::Auto)]
    pub output_unit: OutputUnitArg,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Catalog client id
    #[arg(long)]
    pub client_id: Option<String>,

    /// Catalog client secret
    #[arg(long)]
    pub client_secret: Option<String>,

    /// JSON file holding client_id and client_secret
    #[arg(long)]
    pub spotify_credentials: Option<PathBuf>,

    /// Lyrics API token
    #[arg(long)]
    pub genius_token: Option<String>,

    /// JSON file holding the lyrics API token
    #[arg(long)]
    pub genius_credentials: Option<PathBuf>,

    /// Comma-separated release years (overrides config)
    #[arg(long, value_delimiter = ',')]
    pub years: Option<Vec<String>>,

    /// Genre filter (overrides config)
    #[arg(long)]
    pub genre: Option<String>,

    /// Request the access token before crawling instead of on first use
    #[arg(long)]
    pub eager_token: bool,
}

impl CrawlArgs {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(years) = &self.years {
            config.years = years.clone();
        }
        if let Some(genre) = &self.genre {
            config.genre = genre.clone();
        }
        if self.exact {
            config.lyrics_exact_match = true;
        }
    }

    fn resolved_output_unit(&self) -> OutputUnit {
        match self.output_unit {
            OutputUnitArg::Page => OutputUnit::Page,
            OutputUnitArg::Track => OutputUnit::Track,
            OutputUnitArg::Auto if self.lyrics => OutputUnit::Track,
            OutputUnitArg::Auto => OutputUnit::Page,
        }
    }
}

pub async fn execute(args: CrawlArgs, config: &Config) -> Result<()> {
    let mut config = config.clone();
    args.apply_overrides(&mut config);
    config.validate()?;

    // Fail before any request when a required secret is missing
    let spotify_credentials = ClientCredentials::resolve(
        args.client_id.clone(),
        args.client_secret.clone(),
        args.spotify_credentials.as_deref(),
        EnvVars::SPOTIFY_CLIENT_ID,
        EnvVars::SPOTIFY_CLIENT_SECRET,
    )?;
    let genius_token = if args.lyrics {
        Some(resolve_static_token(
            args.genius_token.clone(),
            args.genius_credentials.as_deref(),
            EnvVars::GENIUS_TOKEN,
        )?)
    } else {
        None
    };

    let fetcher: Arc<dyn HttpFetcher> = Arc::new(ReqwestFetcher::new(Duration::from_secs(
        config.request_timeout_seconds,
    ))?);

    let shutdown = ShutdownSignal::new();
    let listener = shutdown.listen_for_ctrl_c();

    let engine = Arc::new(CrawlEngine::new(
        fetcher.clone(),
        EngineSettings::from(&config),
        shutdown.clone(),
    ));

    let catalog_token =
        ClientCredentialsToken::new(spotify_credentials, &config.spotify_token_url, fetcher);
    if args.eager_token {
        catalog_token.refresh_token().await?;
    }
    let catalog_token: Arc<dyn TokenProvider> = Arc::new(catalog_token);

    let pager = SpotifySearchPager::new(engine.clone(), catalog_token, &config.spotify_api_base);
    let persister = OutputPersister::prepare(&config.output_dir).await?;
    let output_unit = args.resolved_output_unit();

    info!(
        "Crawling genre '{}' for years {} into {} ({:?} files)",
        config.genre,
        config.years.join(", "),
        config.output_dir.display(),
        output_unit
    );

    let spinner = ProgressUtils::create_crawl_spinner();
    let mut pipeline =
        CrawlPipeline::new(pager, persister, output_unit, config.max_concurrent_requests)
            .with_progress(spinner.clone());

    if let Some(token) = genius_token {
        let lyrics_token: Arc<dyn TokenProvider> = Arc::new(StaticToken::new(token));
        let matcher = GeniusLyricsMatcher::from_config(engine.clone(), lyrics_token, &config);
        pipeline = pipeline.with_lyrics(matcher);
    }

    let result = pipeline.run(&SearchFilter::from(&config)).await;
    listener.abort();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            spinner.abandon_with_message(ProgressMessages::CANCELLED);
            return Err(e);
        }
    };

    if shutdown.is_shutdown_requested() {
        spinner.abandon_with_message(format!(
            "{} | {}",
            ProgressMessages::CANCELLED,
            ProgressMessages::crawl_status(&summary)
        ));
        warn!("Crawl interrupted; in-flight results were discarded");
    } else {
        spinner.finish_with_message(format!(
            "{} | {}",
            ProgressMessages::COMPLETED,
            ProgressMessages::crawl_status(&summary)
        ));
    }

    info!(
        "Crawl finished: {} pages, {} tracks, {} files written, {} write failures, {} requests",
        summary.pages,
        summary.tracks,
        summary.files_written,
        summary.write_failures,
        engine.dispatched_requests()
    );

    Ok(())
}
