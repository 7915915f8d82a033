//! User-submitted track count corrections.
//!
//! Submissions are appended to a tab-separated log. A correction takes
//! effect only once it has been submitted at least twice with identical
//! values, at which point [`reconcile`] rewrites the cached album details.

mod log;
mod reconcile;

pub use log::{CorrectionRequest, CorrectionsLog, RawCount};
pub use reconcile::{reconcile, ReconcileReport, MIN_SUBMISSIONS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("invalid correction: {0}")]
    Invalid(String),

    #[error("corrections log error: {0}")]
    Io(#[from] std::io::Error),
}

/// A track count correction for one album.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Correction {
    pub artist: String,
    pub album: String,
    pub original_count: u32,
    pub count: u32,
}

impl Correction {
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.artist, self.album, self.original_count, self.count
        )
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
        let correction = Correction {
            artist: fields.next()?.to_string(),
            album: fields.next()?.to_string(),
            original_count: fields.next()?.trim().parse().ok()?,
            count: fields.next()?.trim().parse().ok()?,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(correction)
    }
}
