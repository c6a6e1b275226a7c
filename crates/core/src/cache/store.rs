//! Atomic persistence of artifacts.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::Error;

/// Write `bytes` to `path` via a temporary sibling and a rename.
///
/// Parent directories are created as needed. Readers never observe a
/// partially written file. The write runs on the blocking pool, so a caller
/// that is cancelled mid-write neither leaves a temporary file behind nor
/// interrupts the rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let parent = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    tokio::fs::create_dir_all(&parent).await.map_err(|e| Error::io(&parent, e))?;

    let target = path.to_path_buf();
    let bytes = bytes.to_vec();

    tokio::task::spawn_blocking(move || {
        let mut temp = NamedTempFile::new_in(&parent).map_err(|e| Error::io(&parent, e))?;
        temp.write_all(&bytes).map_err(|e| Error::io(temp.path(), e))?;
        temp.persist(&target).map_err(|e| Error::io(&target, e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| Error::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_write_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static/css/a.css");
        write_atomic(&path, b"body{}").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"body{}");
        assert_eq!(entries(path.parent().unwrap()), vec!["a.css".to_string()]);
    }

    #[tokio::test]
    async fn test_write_atomic_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        write_atomic(&path, b"one").await.unwrap();
        write_atomic(&path, b"two").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let occupied = dir.path().join("tiles");
        std::fs::create_dir(&occupied).unwrap();
        std::fs::write(occupied.join("0.png"), "tile").unwrap();

        let err = write_atomic(&occupied, b"not a directory").await.unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(entries(dir.path()), vec!["tiles".to_string()]);
    }
}
