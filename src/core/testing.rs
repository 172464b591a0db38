//! Shared fakes for the crawl tests

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::auth::Clock;
use crate::core::engine::{CrawlEngine, EngineSettings, HttpFetcher, HttpRequest, HttpResponse};
use crate::error::Result;
use crate::signal_handler::ShutdownSignal;

/// Serves canned responses keyed by exact URL and records every request.
///
/// Responses queued for a URL are served in order; the last one repeats.
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    requests: Mutex<Vec<HttpRequest>>,
    shutdown_trigger: Mutex<Option<(String, ShutdownSignal)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back((status, body.to_string()));
    }

    /// Request shutdown once `url` has been served, as a Ctrl-C arriving
    /// while that request is in flight would.
    pub fn shutdown_after(&self, url: &str, signal: ShutdownSignal) {
        *self.shutdown_trigger.lock().unwrap() = Some((url.to_string(), signal));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count_for(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url == url)
            .count()
    }
}

#[async_trait]
impl HttpFetcher for FakeFetcher {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        if let Some((trigger, signal)) = self.shutdown_trigger.lock().unwrap().as_ref() {
            if *trigger == url {
                signal.request_shutdown();
            }
        }

        let mut routes = self.routes.lock().unwrap();
        let (status, body) = match routes.get_mut(&url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or((404, String::new())),
            None => (404, String::new()),
        };

        Ok(HttpResponse { status, url, body })
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance_seconds(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap();
        *now = *now + ChronoDuration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn test_engine(fetcher: Arc<FakeFetcher>) -> Arc<CrawlEngine> {
    let settings = EngineSettings {
        max_concurrent_requests: 4,
        request_delay: Duration::ZERO,
        max_retries: 3,
        retry_backoff: Duration::ZERO,
    };
    Arc::new(CrawlEngine::new(fetcher, settings, ShutdownSignal::new()))
}

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh, not-yet-created directory under the system temp dir
pub fn temp_output_dir(name: &str) -> PathBuf {
    let unique = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "trackcrawl-{}-{}-{}",
        name,
        std::process::id(),
        unique
    ))
}
