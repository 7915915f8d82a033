//! Background job scheduling and execution system.
//!
//! Periodic and event-triggered maintenance of the album details cache:
//! recomputing the average track count and applying submitted corrections.

mod context;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use job::{BackgroundJob, HookEvent, JobError, JobSchedule};
pub use scheduler::JobScheduler;
