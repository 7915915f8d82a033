use super::context::JobContext;
use super::job::{BackgroundJob, HookEvent, JobError};
use crate::server::metrics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// How long the loop sleeps when no interval job is pending.
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Manages background job scheduling and execution.
pub struct JobScheduler {
    jobs: HashMap<&'static str, Arc<dyn BackgroundJob>>,

    /// Next due time of each interval-based job.
    next_runs: HashMap<&'static str, Instant>,

    /// Currently running jobs with their task handles.
    running_handles: HashMap<&'static str, JoinHandle<()>>,

    /// Cancellation tokens for each running job.
    job_cancel_tokens: HashMap<&'static str, CancellationToken>,

    /// Receiver for hook events from the HTTP server.
    hook_receiver: mpsc::Receiver<HookEvent>,

    /// Token to signal scheduler shutdown.
    shutdown_token: CancellationToken,
}

impl JobScheduler {
    pub fn new(hook_receiver: mpsc::Receiver<HookEvent>, shutdown_token: CancellationToken) -> Self {
        Self {
            jobs: HashMap::new(),
            next_runs: HashMap::new(),
            running_handles: HashMap::new(),
            job_cancel_tokens: HashMap::new(),
            hook_receiver,
            shutdown_token,
        }
    }

    /// Register a job with the scheduler. Interval jobs first run one
    /// interval after registration.
    pub fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        let job_id = job.id();
        info!("Registering job: {} - {}", job_id, job.description());
        if let Some(interval) = job.schedule().interval() {
            self.next_runs.insert(job_id, Instant::now() + interval);
        }
        self.jobs.insert(job_id, job);
    }

    /// Get the number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Main scheduler loop.
    pub async fn run(&mut self) {
        info!("Starting job scheduler with {} registered jobs", self.job_count());

        // Fire OnStartup hooks
        self.trigger_jobs_for_hook(HookEvent::OnStartup);

        loop {
            // Clean up completed job handles
            self.cleanup_completed_jobs().await;

            let sleep_duration = self.time_until_next_scheduled_job();
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs();
                }
                Some(event) = self.hook_receiver.recv() => {
                    debug!("Received hook event: {}", event);
                    self.trigger_jobs_for_hook(event);
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    fn is_running(&self, job_id: &str) -> bool {
        self.running_handles
            .get(job_id)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Calculate time until the next scheduled job should run.
    fn time_until_next_scheduled_job(&self) -> Duration {
        let now = Instant::now();
        self.next_runs
            .iter()
            .filter(|(job_id, _)| !self.is_running(job_id))
            .map(|(_, next_run)| next_run.saturating_duration_since(now))
            .min()
            .unwrap_or(IDLE_CHECK_INTERVAL)
            .min(IDLE_CHECK_INTERVAL)
    }

    /// Run all jobs that are due for scheduled execution.
    fn run_due_jobs(&mut self) {
        let now = Instant::now();
        let due: Vec<&'static str> = self
            .next_runs
            .iter()
            .filter(|(job_id, next_run)| **next_run <= now && !self.is_running(job_id))
            .map(|(job_id, _)| *job_id)
            .collect();

        for job_id in due {
            self.spawn_job(job_id, "interval");
        }
    }

    /// Trigger all jobs that listen for a specific hook event.
    fn trigger_jobs_for_hook(&mut self, event: HookEvent) {
        let listening: Vec<&'static str> = self
            .jobs
            .iter()
            .filter(|(_, job)| job.schedule().listens_to(event))
            .map(|(job_id, _)| *job_id)
            .collect();

        for job_id in listening {
            if self.is_running(job_id) {
                debug!("Skipping hook trigger for already running job: {}", job_id);
                continue;
            }
            let trigger = format!("hook:{}", event);
            self.spawn_job(job_id, &trigger);
        }
    }

    /// Spawn a job execution task.
    fn spawn_job(&mut self, job_id: &'static str, triggered_by: &str) {
        let job = match self.jobs.get(job_id) {
            Some(job) => Arc::clone(job),
            None => {
                error!("Attempted to spawn unknown job: {}", job_id);
                return;
            }
        };

        info!("Starting job: {} (triggered_by: {})", job_id, triggered_by);

        // Push the next interval run out now so a slow job isn't restarted
        if let Some(interval) = job.schedule().interval() {
            self.next_runs.insert(job_id, Instant::now() + interval);
        }

        metrics::set_background_job_running(job_id, true);

        // Not a child of the shutdown token: jobs that finish on shutdown must not see it
        let cancel_token = CancellationToken::new();
        self.job_cancel_tokens.insert(job_id, cancel_token.clone());
        let ctx = JobContext::new(cancel_token, triggered_by);

        // Spawn the job in a blocking task since jobs are synchronous
        let handle = tokio::spawn(async move {
            let start_time = std::time::Instant::now();
            let result = tokio::task::spawn_blocking(move || job.execute(&ctx)).await;
            let elapsed = start_time.elapsed();

            let status_label = match result {
                Ok(Ok(())) => {
                    info!("Job {} completed successfully in {:?}", job_id, elapsed);
                    "success"
                }
                Ok(Err(JobError::Cancelled)) => {
                    info!("Job {} was cancelled after {:?}", job_id, elapsed);
                    "cancelled"
                }
                Ok(Err(e)) => {
                    error!("Job {} failed after {:?}: {}", job_id, elapsed, e);
                    "failed"
                }
                Err(e) => {
                    error!("Job {} panicked after {:?}: {}", job_id, elapsed, e);
                    "panic"
                }
            };

            metrics::record_background_job_execution(job_id, status_label, elapsed);
            metrics::set_background_job_running(job_id, false);
        });

        self.running_handles.insert(job_id, handle);
    }

    /// Clean up handles for completed jobs.
    async fn cleanup_completed_jobs(&mut self) {
        let completed: Vec<&'static str> = self
            .running_handles
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(job_id, _)| *job_id)
            .collect();

        for job_id in completed {
            if let Some(handle) = self.running_handles.remove(job_id) {
                let _ = handle.await;
            }
            self.job_cancel_tokens.remove(job_id);
        }
    }

    /// Gracefully shut down the scheduler.
    async fn shutdown(&mut self) {
        info!("Shutting down scheduler...");

        for (job_id, token) in &self.job_cancel_tokens {
            let finish = self
                .jobs
                .get(job_id)
                .map(|job| job.finish_on_shutdown())
                .unwrap_or(false);
            if !finish {
                debug!("Cancelling job: {}", job_id);
                token.cancel();
            }
        }

        // Wait for all jobs to complete
        for (job_id, handle) in self.running_handles.drain() {
            if !handle.is_finished() {
                info!("Waiting for job {} to complete...", job_id);
            }
            let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
        }

        self.job_cancel_tokens.clear();
        info!("Scheduler shutdown complete");
    }
}
