//! Checks run before any mirroring work starts.

use std::path::Path;

use anyhow::{Context, Result, bail};
use mapmirror_core::AppConfig;
use url::Url;

const PROBE_FILE: &str = ".mapmirror-write-probe";

/// Create `outdir` if needed and prove it is writable.
pub async fn ensure_writable(outdir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(outdir)
        .await
        .with_context(|| format!("cannot create output directory {}", outdir.display()))?;

    let probe = outdir.join(PROBE_FILE);
    tokio::fs::write(&probe, b"")
        .await
        .with_context(|| format!("output directory {} is not writable", outdir.display()))?;
    tokio::fs::remove_file(&probe)
        .await
        .with_context(|| format!("cannot clean up {}", probe.display()))?;

    Ok(())
}

/// Whether existing files in `outdir` can be listed for reuse.
pub async fn is_readable(outdir: &Path) -> bool {
    tokio::fs::read_dir(outdir).await.is_ok()
}

/// Resolve the origin host to prove the network is reachable.
pub async fn ensure_resolvable(origin: &Url) -> Result<()> {
    let host = origin
        .host_str()
        .with_context(|| format!("origin {origin} has no host"))?;
    let port = origin.port_or_known_default().unwrap_or(443);

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("cannot resolve {host}; network access is required"))?;
    if addrs.next().is_none() {
        bail!("{host} resolved to no addresses; network access is required");
    }

    tracing::debug!(host, port, "origin resolved");
    Ok(())
}

/// Run every startup check, downgrading cache reuse when the output
/// directory cannot be read.
pub async fn check(mut config: AppConfig) -> Result<AppConfig> {
    let origin = config.require_origin()?;

    ensure_writable(&config.outdir).await?;
    ensure_resolvable(&origin).await?;

    if config.reuse_cache && !is_readable(&config.outdir).await {
        tracing::warn!(outdir = %config.outdir.display(), "output directory not readable, cache reuse disabled");
        config.reuse_cache = false;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writable_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let outdir = dir.path().join("nested/dist");

        ensure_writable(&outdir).await.unwrap();

        assert!(outdir.is_dir());
        assert!(!outdir.join(PROBE_FILE).exists());
        assert!(is_readable(&outdir).await);
    }

    #[tokio::test]
    async fn test_writable_fails_under_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, "x").unwrap();

        assert!(ensure_writable(&file.join("dist")).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_readable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_readable(&dir.path().join("absent")).await);
    }

    #[tokio::test]
    async fn test_check_requires_origin() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig { outdir: dir.path().to_path_buf(), ..Default::default() };
        assert!(check(config).await.is_err());
    }
}
