use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Cooperative stop flag shared by the crawl engine and the CLI.
///
/// Once set, no new requests are dispatched; requests already in flight
/// run to completion and their results are discarded.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    pub fn request_shutdown(&self) {
        if !self.shutdown_requested.swap(true, Ordering::AcqRel) {
            info!("Graceful shutdown requested; waiting for in-flight requests");
        }
    }

    /// Flip the flag on the first Ctrl+C.
    pub fn listen_for_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let handler = self.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Received interrupt signal");
                    handler.request_shutdown();
                }
                Err(e) => warn!("Failed to listen for interrupt signal: {}", e),
            }
        })
    }
}
