//! Album Scrobbles Library
//!
//! Corrected album play counts for last.fm users: scrobbles of an album
//! divided by its track count. This library exposes the internal modules for
//! the server and CLI binaries and for testing.

pub mod background_jobs;
pub mod cache;
pub mod clock;
pub mod components;
pub mod config;
pub mod corrections;
pub mod digest;
pub mod error;
pub mod fetch;
pub mod lastfm;
pub mod period;
pub mod server;
pub mod stats;

// Re-export commonly used types for convenience
pub use components::{Components, Sources};
pub use error::{StatsError, StatsResult};
pub use server::{run_server, RequestsLoggingLevel};
