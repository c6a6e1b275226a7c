//! Cache index over a plain output directory.
//!
//! The directory listing is the index: an artifact is found by matching
//! its logical name and extension around a fixed-length fingerprint, so no
//! manifest has to be kept in sync with the files.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::SystemTime;

use super::naming::LogicalName;
use crate::Error;

/// Ordering key of a matching file; the greatest is current.
///
/// Modification time decides. On equal times a fingerprinted name beats
/// the legacy name, then the later creation time, then the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    modified: SystemTime,
    fingerprinted: bool,
    created: SystemTime,
}

/// Locates cached artifacts inside one destination directory.
#[derive(Debug, Clone)]
pub struct CacheIndex {
    dir: PathBuf,
}

impl CacheIndex {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Find the current artifact for `name`, if any.
    ///
    /// A missing or unreadable directory means "nothing cached". Any other
    /// enumeration failure is logged and also treated as a miss, so the
    /// caller falls back to fetching.
    pub async fn locate(&self, name: &LogicalName) -> Option<String> {
        match self.scan(name).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "cache index lookup failed, refetching");
                None
            }
        }
    }

    /// Scan the directory for candidates of `name`.
    ///
    /// Accepts the legacy `<stem><ext>` name and any fingerprinted
    /// `<stem>-<fp><ext>` name. When several candidates exist (older
    /// refreshes are never deleted), the most recently modified wins; ties
    /// are broken as described on [`Candidate`].
    pub async fn scan(&self, name: &LogicalName) -> Result<Option<String>, Error> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                tracing::debug!(dir = %self.dir.display(), "cache directory not readable");
                return Ok(None);
            }
            Err(e) => return Err(Error::CacheIndex(format!("{}: {}", self.dir.display(), e))),
        };

        let legacy = name.legacy_filename();
        let mut best: Option<(Candidate, String)> = None;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::CacheIndex(format!("{}: {}", self.dir.display(), e)))?
        {
            let Some(filename) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let fingerprinted = name.matches_fingerprinted(&filename);
            if filename != legacy && !fingerprinted {
                continue;
            }

            let metadata = entry.metadata().await.ok();
            let candidate = Candidate {
                modified: metadata.as_ref().and_then(|m| m.modified().ok()).unwrap_or(SystemTime::UNIX_EPOCH),
                fingerprinted,
                created: metadata.as_ref().and_then(|m| m.created().ok()).unwrap_or(SystemTime::UNIX_EPOCH),
            };

            let newer = match &best {
                Some((current, current_name)) => (&candidate, &filename) > (current, current_name),
                None => true,
            };
            if newer {
                best = Some((candidate, filename));
            }
        }

        Ok(best.map(|(_, filename)| filename))
    }
}
