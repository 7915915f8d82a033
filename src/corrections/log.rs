use super::{Correction, CorrectionError};
use serde::Deserialize;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// A count as submitted: JSON number or numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    Number(i64),
    Text(String),
}

impl RawCount {
    fn positive(&self, field: &str) -> Result<u32, CorrectionError> {
        let value = match self {
            RawCount::Number(n) => u32::try_from(*n).ok(),
            RawCount::Text(s) => s.trim().parse().ok(),
        };
        value
            .filter(|v| *v > 0)
            .ok_or_else(|| CorrectionError::Invalid(format!("{} must be a positive integer", field)))
    }
}

/// Body of a correction submission. Artist and album arrive as they appear
/// in last.fm URLs.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionRequest {
    pub artist: String,
    pub album: String,
    pub original_count: RawCount,
    pub count: RawCount,
}

fn decode_name(raw: &str, field: &str) -> Result<String, CorrectionError> {
    let decoded = urlencoding::decode(&raw.replace('+', " "))
        .map_err(|_| CorrectionError::Invalid(format!("{} is not valid UTF-8", field)))?
        .into_owned();
    if decoded.trim().is_empty() {
        return Err(CorrectionError::Invalid(format!("{} is required", field)));
    }
    if decoded.contains(['\t', '\n', '\r']) {
        return Err(CorrectionError::Invalid(format!(
            "{} contains control characters",
            field
        )));
    }
    Ok(decoded)
}

impl CorrectionRequest {
    pub fn into_correction(self) -> Result<Correction, CorrectionError> {
        Ok(Correction {
            artist: decode_name(&self.artist, "artist")?,
            album: decode_name(&self.album, "album")?,
            original_count: self.original_count.positive("original_count")?,
            count: self.count.positive("count")?,
        })
    }
}

/// Append-only corrections file.
pub struct CorrectionsLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CorrectionsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, request: CorrectionRequest) -> Result<Correction, CorrectionError> {
        let correction = request.into_correction()?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", correction.to_line())?;

        info!(
            "Recorded correction for {} - {}: {} -> {}",
            correction.artist, correction.album, correction.original_count, correction.count
        );
        Ok(correction)
    }

    /// The whole log; a log that was never written is empty.
    pub fn read(&self) -> Result<String, CorrectionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(artist: &str, album: &str, original: RawCount, count: RawCount) -> CorrectionRequest {
        CorrectionRequest {
            artist: artist.to_string(),
            album: album.to_string(),
            original_count: original,
            count,
        }
    }

    #[test]
    fn decodes_and_appends() {
        let dir = TempDir::new().unwrap();
        let log = CorrectionsLog::new(dir.path().join("corrections.txt"));

        let correction = log
            .append(request(
                "Sigur+R%C3%B3s",
                "Takk...",
                RawCount::Number(12),
                RawCount::Text("11".into()),
            ))
            .unwrap();
        assert_eq!(correction.artist, "Sigur Rós");

        log.append(request("Low", "C'mon", RawCount::Number(10), RawCount::Number(11)))
            .unwrap();
        assert_eq!(
            log.read().unwrap(),
            "Sigur Rós\tTakk...\t12\t11\nLow\tC'mon\t10\t11\n"
        );
    }

    #[test]
    fn rejects_bad_counts_and_names() {
        let dir = TempDir::new().unwrap();
        let log = CorrectionsLog::new(dir.path().join("corrections.txt"));

        for bad in [
            request("Low", "Album", RawCount::Number(0), RawCount::Number(1)),
            request("Low", "Album", RawCount::Number(10), RawCount::Number(-3)),
            request("Low", "Album", RawCount::Number(10), RawCount::Text("ten".into())),
            request("", "Album", RawCount::Number(10), RawCount::Number(11)),
            request("Low", "A%09B", RawCount::Number(10), RawCount::Number(11)),
        ] {
            assert!(matches!(log.append(bad), Err(CorrectionError::Invalid(_))));
        }
        assert_eq!(log.read().unwrap(), "");
    }
}
