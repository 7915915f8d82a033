use axum::extract::FromRef;

use crate::background_jobs::HookEvent;
use crate::corrections::CorrectionsLog;
use crate::digest::DigestBuilder;
use crate::stats::StatsService;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use super::ServerConfig;

pub type GuardedStatsService = Arc<StatsService>;
pub type GuardedDigestBuilder = Arc<DigestBuilder>;
pub type GuardedCorrectionsLog = Arc<CorrectionsLog>;
pub type OptionalHookSender = Option<mpsc::Sender<HookEvent>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub stats: GuardedStatsService,
    pub digest: GuardedDigestBuilder,
    pub corrections: GuardedCorrectionsLog,
    /// Notifies the job scheduler; `None` when no scheduler runs.
    pub hook_sender: OptionalHookSender,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        hash: impl Into<String>,
        stats: GuardedStatsService,
        digest: GuardedDigestBuilder,
        corrections: GuardedCorrectionsLog,
        hook_sender: OptionalHookSender,
    ) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            hash: hash.into(),
            stats,
            digest,
            corrections,
            hook_sender,
        }
    }
}

impl FromRef<ServerState> for GuardedStatsService {
    fn from_ref(input: &ServerState) -> Self {
        input.stats.clone()
    }
}

impl FromRef<ServerState> for GuardedDigestBuilder {
    fn from_ref(input: &ServerState) -> Self {
        input.digest.clone()
    }
}

impl FromRef<ServerState> for GuardedCorrectionsLog {
    fn from_ref(input: &ServerState) -> Self {
        input.corrections.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
