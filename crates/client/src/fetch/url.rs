//! URL helpers: canonicalizing the origin and mapping references onto it.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an origin URL given on the command line.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a reference found in a document against the document's URL.
pub fn resolve(base: &Url, reference: &str) -> Result<Url, UrlError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(UrlError::Empty);
    }
    base.join(reference).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

/// Map a dataset reference to a path relative to the mirror root.
///
/// Root-relative and relative references map to their path. Absolute URLs
/// map only when they share the origin's scheme, host and port; anything
/// else lives outside the mirror and yields `None`.
pub fn origin_path(origin: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("data:") {
        return None;
    }

    let url = origin.join(reference).ok()?;
    if url.origin() != origin.origin() {
        return None;
    }

    let path = url.path().trim_start_matches('/');
    (!path.is_empty()).then(|| path.to_string())
}
