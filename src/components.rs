//! Wiring of the stats pipeline from an [`AppConfig`].

use crate::cache::{CacheBackend, FileCache, MemoryCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, Transport};
use crate::corrections::CorrectionsLog;
use crate::digest::DigestBuilder;
use crate::fetch::{FetchClient, HttpFetcher};
use crate::lastfm::{
    AccountDirectory, AlbumMetadataSource, ApiChartSource, ChartSource, LastFmDirectory,
    WebAlbumMetadata, WebChartSource,
};
use crate::stats::{
    AlbumDetailsProvider, AverageTrackCount, EnrichmentEngine, RawStatsFetcher, RecentUsers,
    StatsService,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// The three upstream seams.
pub struct Sources {
    pub charts: Arc<dyn ChartSource>,
    pub album_metadata: Arc<dyn AlbumMetadataSource>,
    pub directory: Arc<dyn AccountDirectory>,
}

impl Sources {
    /// last.fm over HTTP, using the configured transport for charts and
    /// account lookups. Album pages are always scraped.
    pub fn lastfm(config: &AppConfig, durable_cache: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>) -> Result<Self> {
        let upstream = &config.upstream;
        let fetcher: Arc<dyn HttpFetcher> =
            Arc::new(FetchClient::new(upstream).context("Failed to build HTTP client")?);

        let directory = LastFmDirectory::new(
            fetcher.clone(),
            upstream.web_base_url.clone(),
            Arc::new(MemoryCache::new(clock)),
            durable_cache,
        );

        let (charts, directory): (Arc<dyn ChartSource>, LastFmDirectory) = match upstream.transport {
            Transport::Web => (
                Arc::new(WebChartSource::new(
                    fetcher.clone(),
                    upstream.web_base_url.clone(),
                    upstream.max_items,
                )),
                directory,
            ),
            Transport::Api => {
                let api_key = upstream
                    .api_key
                    .clone()
                    .context("The api transport needs an API key")?;
                (
                    Arc::new(ApiChartSource::new(
                        fetcher.clone(),
                        upstream.api_base_url.clone(),
                        api_key.clone(),
                        upstream.max_items,
                    )),
                    directory.with_api(upstream.api_base_url.clone(), api_key),
                )
            }
        };

        Ok(Self {
            charts,
            album_metadata: Arc::new(WebAlbumMetadata::new(
                fetcher,
                upstream.web_base_url.clone(),
            )),
            directory: Arc::new(directory),
        })
    }
}

/// Everything the server, the CLI and the background jobs share.
pub struct Components {
    pub clock: Arc<dyn Clock>,
    pub cache: Arc<dyn CacheBackend>,
    pub album_details: Arc<AlbumDetailsProvider>,
    pub stats: Arc<StatsService>,
    pub digest: Arc<DigestBuilder>,
    pub corrections: Arc<CorrectionsLog>,
}

impl Components {
    /// Production wiring: file cache under `cache_dir`, system clock, last.fm.
    pub fn build(config: &AppConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache: Arc<dyn CacheBackend> =
            Arc::new(FileCache::new(config.cache_dir.clone(), clock.clone()));
        let sources = Sources::lastfm(config, cache.clone(), clock.clone())?;
        info!(
            "Using {:?} transport, caching under {:?}",
            config.upstream.transport, config.cache_dir
        );
        Ok(Self::assemble(config, sources, cache, clock))
    }

    pub fn assemble(
        config: &AppConfig,
        sources: Sources,
        cache: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let album_details = Arc::new(AlbumDetailsProvider::new(
            sources.album_metadata,
            cache.clone(),
            Arc::new(AverageTrackCount::default()),
        ));
        let engine = Arc::new(EnrichmentEngine::new(
            album_details.clone(),
            config.enrichment.max_concurrency,
            config.enrichment.grace(),
        ));
        let fetcher = Arc::new(RawStatsFetcher::new(
            sources.charts,
            cache.clone(),
            clock.clone(),
            config.upstream.max_items,
        ));
        let stats = Arc::new(StatsService::new(
            sources.directory,
            fetcher,
            engine,
            Arc::new(RecentUsers::new(cache.clone())),
            clock.clone(),
        ));
        let digest = Arc::new(DigestBuilder::new(
            stats.clone(),
            config.public_url.clone(),
            config.upstream.web_base_url.clone(),
        ));

        Self {
            clock,
            cache,
            album_details,
            stats,
            digest,
            corrections: Arc::new(CorrectionsLog::new(config.corrections_file.clone())),
        }
    }
}
