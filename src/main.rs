use clap::{Parser, Subcommand};

mod cli;
mod config;
mod core;
mod error;
mod signal_handler;
mod utils;

use config::Config;
use error::Result;

#[derive(Parser)]
#[command(name = "trackcrawl")]
#[command(about = "Crawl catalog track searches into JSON files, optionally with lyrics")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the search crawl
    Crawl(cli::crawl::CrawlArgs),

    /// Show or edit configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::logging::init_logging(cli.verbose).map_err(error::CrawlError::Internal)?;

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Crawl(args) => cli::crawl::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config, cli.config.as_deref()).await,
    }
}
