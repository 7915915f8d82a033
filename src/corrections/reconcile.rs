use super::Correction;
use crate::cache::Cached;
use crate::stats::AlbumDetails;
use std::collections::HashMap;
use tracing::{info, warn};

/// Identical submissions needed before a correction is applied.
pub const MIN_SUBMISSIONS: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub applied: usize,
    /// Submitted fewer than [`MIN_SUBMISSIONS`] times.
    pub pending: usize,
    /// No cached details for the album.
    pub missing: usize,
    /// Cached count no longer matches the correction's original count,
    /// usually because it was already applied.
    pub diverged: usize,
    pub malformed: usize,
}

/// Applies corrections from `log` to the album details in `cache`. Running
/// it again over the same log changes nothing.
pub fn reconcile(log: &str, cache: &Cached) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    // Submissions only count as identical when their lines match byte for byte.
    let mut tally: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();

    for line in log.lines().filter(|line| !line.trim().is_empty()) {
        let line = line.trim_end_matches('\r');
        let seen = tally.entry(line).or_insert(0);
        if *seen == 0 {
            order.push(line);
        }
        *seen += 1;
    }

    for line in order {
        let Some(correction) = Correction::parse_line(line) else {
            warn!("Skipping malformed correction line {:?}", line);
            report.malformed += 1;
            continue;
        };
        if tally[line] < MIN_SUBMISSIONS {
            report.pending += 1;
            continue;
        }

        let args = [correction.artist.as_str(), correction.album.as_str()];
        let Some(details) = cache.lookup(&args).and_then(|v| AlbumDetails::decode(&v)) else {
            report.missing += 1;
            continue;
        };
        if details.track_count != correction.original_count {
            report.diverged += 1;
            continue;
        }

        let updated = AlbumDetails::new(correction.count, details.cover_url);
        match cache.store(&args, &updated.encode()) {
            Ok(()) => {
                info!("Updating: {}", correction.to_line());
                report.applied += 1;
            }
            Err(e) => warn!(
                "Failed to apply correction for {} - {}: {}",
                correction.artist, correction.album, e
            ),
        }
    }

    report
}
