//! Corrected album statistics.
//!
//! Raw charts come from a [`RawStatsFetcher`], each album is looked up by the
//! [`EnrichmentEngine`] and its scrobbles divided by its track count. The
//! [`StatsService`] ties this to period resolution and ranking.

mod album_details;
mod average;
mod enrichment;
mod models;
mod raw_stats;
mod recent_users;
mod service;

pub use album_details::{AlbumDetailsProvider, ALBUM_DETAILS_NAMESPACE};
pub use average::{AverageTrackCount, DEFAULT_AVERAGE_TRACK_COUNT, MIN_ALBUM_TRACKS};
pub use enrichment::{EnrichmentEngine, DEFAULT_GRACE, DEFAULT_MAX_CONCURRENCY};
pub use models::{rank_by_album_plays, AlbumDetails, CorrectedAlbumStat, RawAlbumEntry};
pub use raw_stats::{cache_tier, CacheTier, RawStatsFetcher};
pub use recent_users::{RecentUsers, MAX_RECENT_USERS, RECENT_USERS_NAMESPACE};
pub use service::{BlastInfo, OverviewBlock, RecentUser, StatsService, UserStats};
