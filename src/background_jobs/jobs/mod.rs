//! Maintenance jobs run by the [`JobScheduler`](super::JobScheduler).

pub mod apply_corrections;
pub mod average_track_count;

pub use apply_corrections::ApplyCorrectionsJob;
pub use average_track_count::AverageTrackCountJob;
