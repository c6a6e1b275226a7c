//! Logical names: the stable, decoration-free base name of a resource.
//!
//! Upstream cache-busting (`.min.` infixes, `-hash.hash` suffixes,
//! `@version` suffixes) is stripped so that a resource keeps the same
//! lookup key across deployments of the origin.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::fingerprint::{FINGERPRINT_LEN, is_fingerprint};

static VERSION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@[^@/]*$").expect("invalid regex"));

static HASH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-[0-9a-f]{6,}(?:\.[0-9a-f]{6,})*$").expect("invalid regex"));

/// A logical resource name split into stem and extension.
///
/// `extension` includes the leading dot, e.g. `.css`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalName {
    pub stem: String,
    pub extension: String,
}

impl LogicalName {
    pub fn new(stem: impl Into<String>, extension: impl Into<String>) -> Self {
        Self { stem: stem.into(), extension: extension.into() }
    }

    /// Derive the logical name of a URL.
    ///
    /// Query and fragment are ignored. When the last path segment has no
    /// extension, `default_extension` is used.
    pub fn from_url(url: &Url, default_extension: &str) -> Self {
        let segment = url.path_segments().and_then(|mut s| s.next_back()).unwrap_or("");

        let (raw_stem, extension) = match segment.rfind('.') {
            Some(idx) if idx > 0 => (&segment[..idx], segment[idx..].to_string()),
            _ => (segment, default_extension.to_string()),
        };

        Self { stem: strip_decorations(raw_stem), extension }
    }

    /// The name used by earlier, unfingerprinted mirrors.
    pub fn legacy_filename(&self) -> String {
        format!("{}{}", self.stem, self.extension)
    }

    /// `<stem>-<fingerprint><ext>`
    pub fn fingerprinted_filename(&self, fingerprint: &str) -> String {
        format!("{}-{}{}", self.stem, fingerprint, self.extension)
    }

    /// Whether `filename` is a fingerprinted artifact of this logical name.
    ///
    /// The fixed fingerprint length pins the total length, so `foo` never
    /// matches an artifact of `foobar`.
    pub fn matches_fingerprinted(&self, filename: &str) -> bool {
        self.fingerprint_in(filename).is_some()
    }

    /// The fingerprint embedded in `filename`, if it belongs to this name.
    pub fn fingerprint_in<'a>(&self, filename: &'a str) -> Option<&'a str> {
        if filename.len() != self.stem.len() + self.extension.len() + FINGERPRINT_LEN + 1 {
            return None;
        }
        let rest = filename.strip_prefix(self.stem.as_str())?;
        let rest = rest.strip_suffix(self.extension.as_str())?;
        let fp = rest.strip_prefix('-')?;
        is_fingerprint(fp).then_some(fp)
    }
}

fn strip_decorations(stem: &str) -> String {
    let mut stem = stem.replace(".min.", ".");
    if let Some(s) = stem.strip_suffix(".min") {
        stem = s.to_string();
    }
    let stem = VERSION_SUFFIX.replace(&stem, "");
    let stem = HASH_SUFFIX.replace(&stem, "");

    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();

    if cleaned.is_empty() { "index".to_string() } else { cleaned }
}
