//! Applies confirmed track count corrections to cached album details.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule},
};
use crate::corrections::{reconcile, CorrectionsLog};
use crate::stats::AlbumDetailsProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Replays the corrections log against the album details cache. Runs
/// periodically and whenever a correction is submitted.
pub struct ApplyCorrectionsJob {
    log: Arc<CorrectionsLog>,
    provider: Arc<AlbumDetailsProvider>,
    interval: Duration,
}

impl ApplyCorrectionsJob {
    pub fn new(
        log: Arc<CorrectionsLog>,
        provider: Arc<AlbumDetailsProvider>,
        interval: Duration,
    ) -> Self {
        Self {
            log,
            provider,
            interval,
        }
    }
}

impl BackgroundJob for ApplyCorrectionsJob {
    fn id(&self) -> &'static str {
        "apply_corrections"
    }

    fn description(&self) -> &'static str {
        "Apply confirmed track count corrections to cached album details"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::every(self.interval).and_on(HookEvent::OnCorrectionSubmitted)
    }

    fn finish_on_shutdown(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        ctx.check_cancelled()?;

        let contents = self.log.read()?;
        let report = reconcile(&contents, self.provider.cache());
        info!(
            "Reconciled {:?} ({}): applied={}, pending={}, missing={}, diverged={}, malformed={}",
            self.log.path(),
            ctx.triggered_by,
            report.applied,
            report.pending,
            report.missing,
            report.diverged,
            report.malformed
        );
        Ok(())
    }
}
