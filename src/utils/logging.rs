use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// HTTP and HTML-parsing crates that are capped at WARN
const QUIET_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "html5ever", "selectors"];

fn crawl_filter(verbose: bool) -> Result<EnvFilter> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    for target in QUIET_TARGETS {
        let directive: Directive = format!("{}=warn", target)
            .parse()
            .with_context(|| format!("Invalid log directive for {}", target))?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

/// Install the global subscriber. Logs go to stderr so they stay out of
/// command output written to stdout.
pub fn init_logging(verbose: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(crawl_filter(verbose)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
