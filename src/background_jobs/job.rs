use super::context::JobContext;
use crate::cache::CacheError;
use crate::corrections::CorrectionError;
use std::fmt;
use std::time::Duration;

/// Something other than the timer that starts a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    OnStartup,
    OnCorrectionSubmitted,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookEvent::OnStartup => "startup",
            HookEvent::OnCorrectionSubmitted => "correction_submitted",
        })
    }
}

/// A job runs every `every` (if set) and whenever one of `hooks` fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSchedule {
    pub every: Option<Duration>,
    pub hooks: Vec<HookEvent>,
}

impl JobSchedule {
    pub fn every(interval: Duration) -> Self {
        Self {
            every: Some(interval),
            hooks: Vec::new(),
        }
    }

    pub fn on(hook: HookEvent) -> Self {
        Self {
            every: None,
            hooks: vec![hook],
        }
    }

    pub fn and_on(mut self, hook: HookEvent) -> Self {
        if !self.hooks.contains(&hook) {
            self.hooks.push(hook);
        }
        self
    }

    pub fn interval(&self) -> Option<Duration> {
        self.every
    }

    pub fn listens_to(&self, event: HookEvent) -> bool {
        self.hooks.contains(&event)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job was cancelled")]
    Cancelled,
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Corrections(#[from] CorrectionError),
    #[error("{0}")]
    Failed(String),
}

/// A maintenance task run by the [`JobScheduler`](super::JobScheduler).
///
/// `execute` is called on a blocking thread, so jobs do file and cache I/O
/// directly.
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier, also used as a metrics label.
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn schedule(&self) -> JobSchedule;

    /// Whether shutdown waits for a running instance instead of cancelling
    /// it.
    fn finish_on_shutdown(&self) -> bool {
        false
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
