use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use albumscrobbles::background_jobs::jobs::{ApplyCorrectionsJob, AverageTrackCountJob};
use albumscrobbles::background_jobs::JobScheduler;
use albumscrobbles::config::{self, Transport};
use albumscrobbles::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use albumscrobbles::Components;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the file cache. Created if missing.
    #[clap(long, value_parser = parse_path)]
    pub cache_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// The maximum age of stats responses in browser caches, in seconds.
    #[clap(long, default_value_t = 3600)]
    pub content_cache_age_sec: usize,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Public base URL used in digest and feed links.
    #[clap(long)]
    pub public_url: Option<String>,

    /// Corrections log. Defaults to corrections.txt in the cache directory.
    #[clap(long, value_parser = parse_path)]
    pub corrections_file: Option<PathBuf>,

    /// How album charts are read from last.fm.
    #[clap(long, default_value = "web")]
    pub transport: Transport,

    /// last.fm API key, required by the api transport.
    #[clap(long)]
    pub api_key: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            cache_dir: args.cache_dir.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            content_cache_age_sec: args.content_cache_age_sec,
            frontend_dir_path: args.frontend_dir_path.clone(),
            public_url: args.public_url.clone(),
            corrections_file: args.corrections_file.clone(),
            transport: args.transport,
            api_key: args.api_key.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration:");
    info!("  cache_dir: {:?}", app_config.cache_dir);
    info!("  port: {}", app_config.port);
    info!("  public_url: {}", app_config.public_url);
    info!("  corrections_file: {:?}", app_config.corrections_file);
    info!("  transport: {:?}", app_config.upstream.transport);

    std::fs::create_dir_all(&app_config.cache_dir)
        .with_context(|| format!("Failed to create cache dir {:?}", app_config.cache_dir))?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    let components = Components::build(&app_config)?;

    let shutdown_token = CancellationToken::new();
    let (hook_sender, hook_receiver) = tokio::sync::mpsc::channel(100);

    let mut scheduler = JobScheduler::new(hook_receiver, shutdown_token.clone());
    scheduler.register_job(Arc::new(AverageTrackCountJob::new(
        components.album_details.clone(),
        app_config.background_jobs.average_interval(),
    )));
    scheduler.register_job(Arc::new(ApplyCorrectionsJob::new(
        components.corrections.clone(),
        components.album_details.clone(),
        app_config.background_jobs.corrections_interval(),
    )));

    let state = ServerState::new(
        ServerConfig::from(&app_config),
        env!("GIT_HASH"),
        components.stats.clone(),
        components.digest.clone(),
        components.corrections.clone(),
        Some(hook_sender),
    );

    info!("Ready to serve at port {}!", app_config.port);

    // Run HTTP server and job scheduler concurrently
    tokio::select! {
        result = run_server(state, shutdown_token.clone()) => {
            info!("HTTP server stopped: {:?}", result);
            shutdown_token.cancel();
            result
        },
        _ = scheduler.run() => {
            info!("Scheduler stopped");
            Ok(())
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            shutdown_token.cancel();
            // Give the scheduler a moment to shut down gracefully
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        }
    }
}
