mod file_config;

pub use file_config::{BackgroundJobsConfig, EnrichmentConfig, FileConfig, UpstreamConfig};

use crate::lastfm::{DEFAULT_API_BASE_URL, DEFAULT_WEB_BASE_URL};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CACHE_DIR: &str = "/tmp/albumscrobbles";
pub const DEFAULT_USER_AGENT: &str = concat!("albumscrobbles/", env!("CARGO_PKG_VERSION"));

/// How album charts are read from last.fm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Transport {
    /// Scrape the public library pages.
    #[default]
    Web,
    /// Use the JSON API; requires an API key.
    Api,
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub cache_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub public_url: Option<String>,
    pub corrections_file: Option<PathBuf>,
    pub transport: Transport,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub cache_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    /// Base URL used in links we hand out (digests, feeds).
    pub public_url: String,
    pub corrections_file: PathBuf,

    // Feature configs (with defaults)
    pub upstream: UpstreamSettings,
    pub enrichment: EnrichmentSettings,
    pub background_jobs: BackgroundJobsSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let cache_dir = file
            .cache_dir
            .map(PathBuf::from)
            .or_else(|| cli.cache_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

        // Created on startup when missing
        if cache_dir.exists() && !cache_dir.is_dir() {
            bail!("cache_dir is not a directory: {:?}", cache_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let content_cache_age_sec = file
            .content_cache_age_sec
            .unwrap_or(cli.content_cache_age_sec);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let public_url = file
            .public_url
            .or_else(|| cli.public_url.clone())
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let corrections_file = file
            .corrections_file
            .map(PathBuf::from)
            .or_else(|| cli.corrections_file.clone())
            .unwrap_or_else(|| cache_dir.join("corrections.txt"));

        // Upstream settings - merge file config with CLI and defaults
        let up_file = file.upstream.unwrap_or_default();
        let defaults = UpstreamSettings::default();
        let transport = match up_file.transport {
            Some(s) => match Transport::from_str(&s, true) {
                Ok(transport) => transport,
                Err(_) => bail!("Unknown upstream transport: {:?}", s),
            },
            None => cli.transport,
        };
        let upstream = UpstreamSettings {
            transport,
            api_key: up_file.api_key.or_else(|| cli.api_key.clone()),
            timeout_secs: up_file.timeout_secs.unwrap_or(defaults.timeout_secs),
            max_attempts: up_file.max_attempts.unwrap_or(defaults.max_attempts),
            initial_backoff_ms: up_file
                .initial_backoff_ms
                .unwrap_or(defaults.initial_backoff_ms),
            max_items: up_file.max_items.unwrap_or(defaults.max_items),
            user_agent: up_file.user_agent.unwrap_or(defaults.user_agent),
            web_base_url: up_file
                .web_base_url
                .unwrap_or(defaults.web_base_url)
                .trim_end_matches('/')
                .to_string(),
            api_base_url: up_file.api_base_url.unwrap_or(defaults.api_base_url),
        };

        if upstream.transport == Transport::Api && upstream.api_key.is_none() {
            bail!("The api transport requires an api_key");
        }
        if !(1..=MAX_CHART_ITEMS).contains(&upstream.max_items) {
            bail!(
                "max_items must be between 1 and {}, got {}",
                MAX_CHART_ITEMS,
                upstream.max_items
            );
        }
        if upstream.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }

        let en_file = file.enrichment.unwrap_or_default();
        let enrichment = EnrichmentSettings {
            max_concurrency: en_file
                .max_concurrency
                .unwrap_or(crate::stats::DEFAULT_MAX_CONCURRENCY),
            grace_secs: en_file
                .grace_secs
                .unwrap_or(crate::stats::DEFAULT_GRACE.as_secs()),
        };
        if enrichment.max_concurrency == 0 || enrichment.grace_secs == 0 {
            bail!("enrichment max_concurrency and grace_secs must be positive");
        }

        let bj_file = file.background_jobs.unwrap_or_default();
        let bj_defaults = BackgroundJobsSettings::default();
        let background_jobs = BackgroundJobsSettings {
            average_interval_hours: bj_file
                .average_interval_hours
                .unwrap_or(bj_defaults.average_interval_hours),
            corrections_interval_hours: bj_file
                .corrections_interval_hours
                .unwrap_or(bj_defaults.corrections_interval_hours),
        };
        if background_jobs.average_interval_hours == 0
            || background_jobs.corrections_interval_hours == 0
        {
            bail!("background job intervals must be at least one hour");
        }

        Ok(Self {
            cache_dir,
            port,
            logging_level,
            content_cache_age_sec,
            frontend_dir_path,
            public_url,
            corrections_file,
            upstream,
            enrichment,
            background_jobs,
        })
    }
}

/// Most albums the upstream library page shows at once.
pub const MAX_CHART_ITEMS: usize = 50;

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub transport: Transport,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Attempts per request, including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    /// Chart entries kept per request.
    pub max_items: usize,
    pub user_agent: String,
    pub web_base_url: String,
    pub api_base_url: String,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            transport: Transport::Web,
            api_key: None,
            timeout_secs: 8,
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_items: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            web_base_url: DEFAULT_WEB_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub max_concurrency: usize,
    pub grace_secs: u64,
}

impl EnrichmentSettings {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            max_concurrency: crate::stats::DEFAULT_MAX_CONCURRENCY,
            grace_secs: crate::stats::DEFAULT_GRACE.as_secs(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackgroundJobsSettings {
    pub average_interval_hours: u64,
    pub corrections_interval_hours: u64,
}

impl BackgroundJobsSettings {
    pub fn average_interval(&self) -> Duration {
        Duration::from_secs(self.average_interval_hours * 3600)
    }

    pub fn corrections_interval(&self) -> Duration {
        Duration::from_secs(self.corrections_interval_hours * 3600)
    }
}

impl Default for BackgroundJobsSettings {
    fn default() -> Self {
        Self {
            average_interval_hours: 24,
            corrections_interval_hours: 24,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
