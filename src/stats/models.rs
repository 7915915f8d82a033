use crate::error::{StatsError, StatsResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One row of an upstream album chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlbumEntry {
    pub album_name: String,
    pub artist_name: String,
    /// As shown upstream, possibly with thousands separators ("1,234").
    pub scrobble_count: String,
    pub rank: u32,
}

impl RawAlbumEntry {
    pub fn new(
        album_name: impl Into<String>,
        artist_name: impl Into<String>,
        scrobble_count: impl Into<String>,
        rank: u32,
    ) -> Self {
        Self {
            album_name: album_name.into(),
            artist_name: artist_name.into(),
            scrobble_count: scrobble_count.into(),
            rank,
        }
    }

    pub fn scrobbles(&self) -> Option<u64> {
        self.scrobble_count
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect::<String>()
            .parse()
            .ok()
    }
}

/// Track count and cover of an album, stored as `"{track_count},{cover_url}"`.
/// Estimated counts carry a `~` before the number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumDetails {
    pub track_count: u32,
    pub cover_url: String,
    /// The count is the average fallback, not the album's real length.
    pub estimated: bool,
}

const ESTIMATED_MARKER: char = '~';

impl AlbumDetails {
    pub fn new(track_count: u32, cover_url: impl Into<String>) -> Self {
        Self {
            track_count,
            cover_url: cover_url.into(),
            estimated: false,
        }
    }

    pub fn estimated(track_count: u32, cover_url: impl Into<String>) -> Self {
        Self {
            estimated: true,
            ..Self::new(track_count, cover_url)
        }
    }

    pub fn encode(&self) -> String {
        if self.estimated {
            format!("{}{},{}", ESTIMATED_MARKER, self.track_count, self.cover_url)
        } else {
            format!("{},{}", self.track_count, self.cover_url)
        }
    }

    /// Cover URLs may contain commas; only the first one separates fields.
    pub fn decode(value: &str) -> Option<Self> {
        let (count, cover) = value.split_once(',')?;
        let count = count.trim();
        let (count, estimated) = match count.strip_prefix(ESTIMATED_MARKER) {
            Some(count) => (count, true),
            None => (count, false),
        };
        Some(Self {
            track_count: count.parse().ok()?,
            cover_url: cover.to_string(),
            estimated,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectedAlbumStat {
    pub album_name: String,
    pub artist_name: String,
    pub scrobble_count: u64,
    pub track_count: u32,
    pub album_scrobble_count: f64,
    pub original_position: u32,
    pub cover_url: String,
}

impl CorrectedAlbumStat {
    pub fn compute(entry: &RawAlbumEntry, details: &AlbumDetails) -> StatsResult<Self> {
        let scrobble_count = entry.scrobbles().ok_or_else(|| {
            StatsError::Parse(format!(
                "bad scrobble count {:?} for {} - {}",
                entry.scrobble_count, entry.artist_name, entry.album_name
            ))
        })?;
        let track_count = details.track_count.max(1);

        Ok(Self {
            album_name: entry.album_name.clone(),
            artist_name: entry.artist_name.clone(),
            scrobble_count,
            track_count,
            album_scrobble_count: scrobble_count as f64 / track_count as f64,
            original_position: entry.rank,
            cover_url: details.cover_url.clone(),
        })
    }
}

/// Orders by album plays, highest first; ties keep the upstream order.
pub fn rank_by_album_plays(stats: &mut [CorrectedAlbumStat]) {
    stats.sort_by(|a, b| {
        b.album_scrobble_count
            .partial_cmp(&a.album_scrobble_count)
            .unwrap_or(Ordering::Equal)
            .then(a.original_position.cmp(&b.original_position))
    });
}
