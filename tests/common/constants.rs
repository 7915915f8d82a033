//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When the fake last.fm data changes, update only this file.

// ============================================================================
// Clock
// ============================================================================

/// Every test server runs on this day (a Friday, ISO week 2 of 2025).
pub const TODAY: (i32, u32, u32) = (2025, 1, 10);

// ============================================================================
// Test Users
// ============================================================================

/// User with a chart of three albums, scrobbling since 2015
pub const TEST_USER: &str = "testuser";

pub const TEST_USER_START_YEAR: i32 = 2015;

/// User that exists but never scrobbled anything
pub const SILENT_USER: &str = "silentuser";

/// User that started scrobbling this year
pub const NEW_USER: &str = "newuser";

/// Well-formed username that last.fm doesn't know
pub const UNKNOWN_USER: &str = "ghostuser";

// ============================================================================
// Test Albums
// ============================================================================

/// Rank 1 by scrobbles, but long: 1200 scrobbles / 24 tracks = 50 plays
pub const LONG_ALBUM: &str = "Long Album";
pub const LONG_ALBUM_ARTIST: &str = "Band A";
pub const LONG_ALBUM_SCROBBLES: &str = "1,200";
pub const LONG_ALBUM_TRACKS: u32 = 24;

/// Rank 2 by scrobbles: 600 scrobbles / 6 tracks = 100 plays
pub const SHORT_ALBUM: &str = "Short Album";
pub const SHORT_ALBUM_ARTIST: &str = "Band B";
pub const SHORT_ALBUM_SCROBBLES: &str = "600";
pub const SHORT_ALBUM_TRACKS: u32 = 6;
pub const SHORT_ALBUM_COVER: &str = "https://img.test/short.png";

/// Rank 3, its album page is missing: 300 scrobbles / 12 (average) = 25 plays
pub const MISSING_ALBUM: &str = "Missing Album";
pub const MISSING_ALBUM_ARTIST: &str = "Band C";
pub const MISSING_ALBUM_SCROBBLES: &str = "300";

/// Fallback track count when nothing is cached yet
pub const DEFAULT_AVERAGE_TRACKS: u32 = 12;

// ============================================================================
// Server
// ============================================================================

pub const PUBLIC_URL: &str = "http://albumscrobbles.test";

pub const LASTFM_URL: &str = "https://www.last.fm";

pub const BUILD_HASH: &str = "test-hash";

// ============================================================================
// Timeouts and Delays
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Default timeout for HTTP requests in tests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server readiness (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Maximum time to wait for a background job to finish (milliseconds)
pub const JOB_TIMEOUT_MS: u64 = 5000;
