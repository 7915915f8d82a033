use super::{AlbumDetailsProvider, CorrectedAlbumStat, RawAlbumEntry};
use crate::server::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_GRACE: Duration = Duration::from_secs(60);

enum TaskOutcome {
    Enriched(CorrectedAlbumStat),
    Failed,
    Misfire,
}

impl TaskOutcome {
    fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Enriched(_) => "ok",
            TaskOutcome::Failed => "failed",
            TaskOutcome::Misfire => "misfire",
        }
    }
}

/// Turns raw chart entries into corrected album stats, looking album
/// details up concurrently.
///
/// At most `max_concurrency` lookups run at once. A lookup that cannot start
/// within `grace` is dropped, as is one that takes longer than `grace`. The
/// whole batch is given `grace * max_concurrency`; whatever is still running
/// then is aborted. Failed albums are left out of the result, whose order is
/// unspecified.
pub struct EnrichmentEngine {
    provider: Arc<AlbumDetailsProvider>,
    max_concurrency: usize,
    grace: Duration,
}

impl EnrichmentEngine {
    pub fn new(provider: Arc<AlbumDetailsProvider>, max_concurrency: usize, grace: Duration) -> Self {
        Self {
            provider,
            max_concurrency: max_concurrency.max(1),
            grace,
        }
    }

    pub fn provider(&self) -> &Arc<AlbumDetailsProvider> {
        &self.provider
    }

    pub async fn enrich(&self, entries: Vec<RawAlbumEntry>) -> Vec<CorrectedAlbumStat> {
        if entries.is_empty() {
            return Vec::new();
        }

        let total = entries.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for entry in entries {
            let provider = self.provider.clone();
            let semaphore = semaphore.clone();
            let grace = self.grace;

            tasks.spawn(async move {
                let _permit = match timeout(grace, semaphore.acquire_owned()).await {
                    Ok(Ok(permit)) => permit,
                    _ => {
                        warn!(
                            "Dropping {} - {}: no slot within {:?}",
                            entry.artist_name, entry.album_name, grace
                        );
                        return TaskOutcome::Misfire;
                    }
                };

                let lookup = provider.details(&entry.artist_name, &entry.album_name);
                match timeout(grace, lookup).await {
                    Ok(Ok(details)) => match CorrectedAlbumStat::compute(&entry, &details) {
                        Ok(stat) => TaskOutcome::Enriched(stat),
                        Err(e) => {
                            warn!("Skipping album: {}", e);
                            TaskOutcome::Failed
                        }
                    },
                    Ok(Err(e)) => {
                        warn!(
                            "Failed to enrich {} - {}: {}",
                            entry.artist_name, entry.album_name, e
                        );
                        TaskOutcome::Failed
                    }
                    Err(_) => {
                        warn!(
                            "Album details for {} - {} timed out",
                            entry.artist_name, entry.album_name
                        );
                        TaskOutcome::Failed
                    }
                }
            });
        }

        let deadline = Instant::now() + self.grace * self.max_concurrency as u32;
        let mut stats = Vec::with_capacity(total);
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(outcome))) => {
                    metrics::record_enrichment_task(outcome.label());
                    if let TaskOutcome::Enriched(stat) = outcome {
                        stats.push(stat);
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!("Enrichment task panicked: {}", e);
                    metrics::record_enrichment_task("failed");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Enrichment deadline reached, aborting {} pending lookups",
                        tasks.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        debug!("Enriched {} of {} albums", stats.len(), total);
        stats
    }
}
