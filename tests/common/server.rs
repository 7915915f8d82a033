//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own cache directory, a fixed
//! clock and fake last.fm sources.

use super::constants::*;
use super::fixtures::{FakeAlbumPages, FakeCharts, FakeDirectory};
use albumscrobbles::background_jobs::jobs::{ApplyCorrectionsJob, AverageTrackCountJob};
use albumscrobbles::background_jobs::JobScheduler;
use albumscrobbles::cache::{CacheBackend, FileCache};
use albumscrobbles::clock::{Clock, ManualClock};
use albumscrobbles::config::{AppConfig, CliConfig};
use albumscrobbles::server::metrics::init_metrics;
use albumscrobbles::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use albumscrobbles::stats::AlbumDetailsProvider;
use albumscrobbles::{Components, Sources};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance with an isolated cache directory
///
/// When dropped, the server and its job scheduler shut down and the cache
/// directory is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Chart source, to count how many requests reached "last.fm"
    pub charts: Arc<FakeCharts>,

    /// Album details, for direct cache access in tests
    pub album_details: Arc<AlbumDetailsProvider>,

    // Private fields - keep resources alive until drop
    _cache_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    scheduler_token: CancellationToken,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the server cannot be set up or doesn't become ready within
    /// the timeout.
    pub async fn spawn() -> Self {
        init_metrics();
        let cache_dir = TempDir::new().expect("Failed to create cache dir");

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let cli_config = CliConfig {
            cache_dir: Some(cache_dir.path().to_path_buf()),
            port,
            public_url: Some(PUBLIC_URL.to_string()),
            ..Default::default()
        };
        let app_config = AppConfig::resolve(&cli_config, None).expect("Invalid test config");

        let (year, month, day) = TODAY;
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_date(
            NaiveDate::from_ymd_opt(year, month, day).expect("Invalid test date"),
        ));
        let cache: Arc<dyn CacheBackend> =
            Arc::new(FileCache::new(cache_dir.path(), clock.clone()));

        let charts = Arc::new(FakeCharts::new());
        let sources = Sources {
            charts: charts.clone(),
            album_metadata: Arc::new(FakeAlbumPages::new()),
            directory: Arc::new(FakeDirectory::new()),
        };
        let components = Components::assemble(&app_config, sources, cache, clock);

        // Background jobs, with intervals long enough to only run on hooks
        let scheduler_token = CancellationToken::new();
        let (hook_sender, hook_receiver) = tokio::sync::mpsc::channel(16);
        let mut scheduler = JobScheduler::new(hook_receiver, scheduler_token.clone());
        scheduler.register_job(Arc::new(AverageTrackCountJob::new(
            components.album_details.clone(),
            Duration::from_secs(24 * 3600),
        )));
        scheduler.register_job(Arc::new(ApplyCorrectionsJob::new(
            components.corrections.clone(),
            components.album_details.clone(),
            Duration::from_secs(24 * 3600),
        )));
        tokio::spawn(async move { scheduler.run().await });

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            content_cache_age_sec: 60,
            frontend_dir_path: None,
        };
        let state = ServerState::new(
            config,
            BUILD_HASH,
            components.stats.clone(),
            components.digest.clone(),
            components.corrections.clone(),
            Some(hook_sender),
        );
        let app = make_app(state);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            charts,
            album_details: components.album_details.clone(),
            _cache_dir: cache_dir,
            _shutdown_tx: Some(shutdown_tx),
            scheduler_token,
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the / endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    // Server is ready
                    return;
                }
                _ => {
                    // Server not ready yet, wait and retry
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }

    /// Polls the album details cache until `predicate` holds for the cached
    /// value of `(artist, album)`.
    ///
    /// # Panics
    ///
    /// Panics if it doesn't within [`JOB_TIMEOUT_MS`].
    pub async fn wait_for_album_details<F>(&self, artist: &str, album: &str, predicate: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        let start = std::time::Instant::now();
        loop {
            if let Some(value) = self.album_details.cache().lookup(&[artist, album]) {
                if predicate(&value) {
                    return value;
                }
            }
            if start.elapsed() > Duration::from_millis(JOB_TIMEOUT_MS) {
                panic!(
                    "Album details for {} - {} did not change within {}ms",
                    artist, album, JOB_TIMEOUT_MS
                );
            }
            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.scheduler_token.cancel();
        // TempDir will be cleaned up automatically
    }
}
