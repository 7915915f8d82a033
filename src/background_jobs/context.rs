use super::job::JobError;
use tokio_util::sync::CancellationToken;

/// What the scheduler hands a running job: why it started and a way to
/// notice shutdown.
#[derive(Clone)]
pub struct JobContext {
    pub cancellation_token: CancellationToken,
    /// `"interval"` or `"hook:<event>"`.
    pub triggered_by: String,
}

impl JobContext {
    pub fn new(cancellation_token: CancellationToken, triggered_by: impl Into<String>) -> Self {
        Self {
            cancellation_token,
            triggered_by: triggered_by.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// `Err(JobError::Cancelled)` once shutdown was requested.
    pub fn check_cancelled(&self) -> Result<(), JobError> {
        if self.is_cancelled() {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }
}
