//! Refreshes the fallback track count used for albums of unknown length.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule},
};
use crate::stats::AlbumDetailsProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Recomputes the average track count over every cached album on startup
/// and then periodically.
pub struct AverageTrackCountJob {
    provider: Arc<AlbumDetailsProvider>,
    interval: Duration,
}

impl AverageTrackCountJob {
    pub fn new(provider: Arc<AlbumDetailsProvider>, interval: Duration) -> Self {
        Self { provider, interval }
    }
}

impl BackgroundJob for AverageTrackCountJob {
    fn id(&self) -> &'static str {
        "average_track_count"
    }

    fn description(&self) -> &'static str {
        "Recompute the fallback track count from cached album details"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::every(self.interval).and_on(HookEvent::OnStartup)
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        ctx.check_cancelled()?;

        let previous = self.provider.average().get();
        let average = self.provider.recompute_average()?;
        if average != previous {
            info!(
                "Average track count changed from {} to {} ({})",
                previous, average, ctx.triggered_by
            );
        }
        Ok(())
    }
}
