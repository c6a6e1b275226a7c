//! Resource cache writer.
//!
//! Two ways of persisting an upstream resource into the mirror:
//!
//! - [`ResourceCache::cache`]: content-addressed. The file is stored as
//!   `<prefix>/<logical-name>-<fingerprint><ext>` and the served path is
//!   returned so that referencing documents can be rewritten.
//! - [`ResourceCache::mirror_path`]: pass-through. The file keeps its
//!   upstream relative path (datasets, images, tiles).
//!
//! Both reuse an existing copy unless a refresh is requested, skip 404s
//! where the caller allows it, and fall back to the existing copy when a
//! refresh fails.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use mapmirror_core::cache::write_atomic;
use mapmirror_core::{AppConfig, CacheIndex, Error, LogicalName, fingerprint};
use reqwest::Url;

use crate::fetch::RetryingFetcher;
use crate::report::Outcome;
use crate::transform::ContentTransform;

/// One resource to be cached under a destination prefix.
#[derive(Clone)]
pub struct ResourceRequest {
    pub url: Url,
    /// Directory relative to the mirror root, e.g. `static/css`.
    pub prefix: String,
    /// Extension used when the URL has none, e.g. `.css`.
    pub default_extension: String,
    pub transform: Option<Arc<dyn ContentTransform>>,
}

impl ResourceRequest {
    pub fn new(url: Url, prefix: impl Into<String>, default_extension: impl Into<String>) -> Self {
        Self { url, prefix: prefix.into(), default_extension: default_extension.into(), transform: None }
    }

    pub fn with_transform(mut self, transform: Arc<dyn ContentTransform>) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// Result of caching a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached {
    /// Path relative to the mirror root, with `/` separators.
    pub served_path: String,
    pub outcome: Outcome,
}

pub struct ResourceCache {
    config: Arc<AppConfig>,
    origin: Url,
    fetcher: Arc<RetryingFetcher>,
}

impl ResourceCache {
    pub fn new(config: Arc<AppConfig>, fetcher: Arc<RetryingFetcher>) -> Result<Self, Error> {
        let origin = config.require_origin()?;
        Ok(Self { config, origin, fetcher })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn fetcher(&self) -> &Arc<RetryingFetcher> {
        &self.fetcher
    }

    /// Cache `request` under its prefix and return the served path.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the resource is missing upstream and nothing
    ///   is cached.
    /// - Transform and I/O failures, unless a cached copy can be served.
    pub async fn cache(&self, request: &ResourceRequest) -> Result<Cached, Error> {
        let name = LogicalName::from_url(&request.url, &request.default_extension);
        let prefix = request.prefix.trim_matches('/');
        let dir = self.config.outdir.join(prefix);

        let existing = if self.config.reuse_cache { CacheIndex::new(&dir).locate(&name).await } else { None };

        if let Some(filename) = &existing
            && !self.config.refresh
        {
            tracing::info!(url = %request.url, path = %served_path(prefix, filename), "reusing cached artifact");
            return Ok(Cached { served_path: served_path(prefix, filename), outcome: Outcome::Reused });
        }

        match self.fetch_and_store(request, &name, &dir).await {
            Ok(filename) => Ok(Cached { served_path: served_path(prefix, &filename), outcome: Outcome::Fetched }),
            Err(e) => match existing {
                Some(filename) => {
                    tracing::warn!(
                        url = %request.url,
                        path = %served_path(prefix, &filename),
                        error = %e,
                        "refresh failed, keeping cached artifact"
                    );
                    Ok(Cached { served_path: served_path(prefix, &filename), outcome: Outcome::Stale })
                }
                None => Err(e),
            },
        }
    }

    async fn fetch_and_store(
        &self,
        request: &ResourceRequest,
        name: &LogicalName,
        dir: &Path,
    ) -> Result<String, Error> {
        let response = self.fetcher.fetch(&request.url).await?;

        let bytes = match &request.transform {
            Some(transform) => {
                tracing::debug!(url = %request.url, transform = transform.name(), "applying transform");
                transform.apply(&request.url, response.bytes).await?
            }
            None => response.bytes,
        };

        let filename = name.fingerprinted_filename(&fingerprint(&bytes));
        let path = dir.join(&filename);
        write_atomic(&path, &bytes).await?;

        tracing::info!(url = %request.url, path = %path.display(), bytes = bytes.len(), "cached");
        Ok(filename)
    }

    /// Mirror the origin resource at `relative` to the same relative path.
    ///
    /// A 404 is logged and reported as [`Outcome::Skipped`].
    pub async fn mirror_path(&self, relative: &str) -> Result<Outcome, Error> {
        let relative_path = safe_relative(relative)?;
        let url = self
            .origin
            .join(relative.trim_start_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{relative}: {e}")))?;
        let path = self.config.outdir.join(&relative_path);

        let exists = self.config.reuse_cache && tokio::fs::try_exists(&path).await.unwrap_or(false);
        if exists && !self.config.refresh {
            tracing::debug!(path = %path.display(), "reusing mirrored file");
            return Ok(Outcome::Reused);
        }

        let result = match self.fetcher.fetch(&url).await {
            Ok(response) => write_atomic(&path, &response.bytes).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::debug!(url = %url, path = %path.display(), "mirrored");
                Ok(Outcome::Fetched)
            }
            Err(e) if exists => {
                tracing::warn!(url = %url, error = %e, "refresh failed, keeping mirrored file");
                Ok(Outcome::Stale)
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(url = %url, "not found upstream, skipping");
                Ok(Outcome::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    /// Absolute location of a mirrored relative path.
    pub fn local_path(&self, relative: &str) -> Result<PathBuf, Error> {
        Ok(self.config.outdir.join(safe_relative(relative)?))
    }
}

fn served_path(prefix: &str, filename: &str) -> String {
    if prefix.is_empty() { filename.to_string() } else { format!("{prefix}/{filename}") }
}

/// Reject paths that would escape the output directory.
fn safe_relative(relative: &str) -> Result<PathBuf, Error> {
    let path = Path::new(relative.trim_start_matches('/'));
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(Error::InvalidUrl(format!("path escapes the mirror: {relative}"))),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(Error::InvalidUrl(format!("empty mirror path: {relative:?}")));
    }
    Ok(clean)
}
