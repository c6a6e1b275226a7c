//! Entry document rewriting.
//!
//! The top-level HTML document is fetched once; every stylesheet and script
//! in its head is routed through the [`ResourceCache`] and its reference is
//! replaced by the cached, fingerprinted path. Scripts from blocked
//! prefixes (tracking, edge workers) are removed.
//!
//! Extraction uses scraper; the rewrite itself is a lol_html streaming pass
//! so the rest of the document is preserved byte for byte.

pub mod references;

pub use references::{Reference, ReferenceKind, extract_references};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use html_escape::decode_html_entities;
use lol_html::{HtmlRewriter, Settings, element};
use mapmirror_core::cache::write_atomic;
use mapmirror_core::{Error, LogicalName};
use reqwest::Url;

use crate::report::{Outcome, PhaseReport};
use crate::resource::{ResourceCache, ResourceRequest};
use crate::transform::{ContentTransform, EmbedSubResources, RewriteOrigin};

/// Filename of the mirrored entry document.
pub const ENTRY_FILE: &str = "index.html";

const CSS_PREFIX: &str = "static/css";
const JS_PREFIX: &str = "static/js";

/// Result of rewriting a document.
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub html: String,
    /// One outcome per cached reference.
    pub outcomes: Vec<Outcome>,
    /// Number of script elements removed.
    pub removed: usize,
}

pub struct DocumentRewriter {
    cache: Arc<ResourceCache>,
    embed: Arc<dyn ContentTransform>,
    origin_rewrite: Arc<dyn ContentTransform>,
}

impl DocumentRewriter {
    pub fn new(cache: Arc<ResourceCache>) -> Result<Self, Error> {
        let embed = Arc::new(EmbedSubResources::new(cache.fetcher().clone()));
        let origin_rewrite =
            Arc::new(RewriteOrigin::new(cache.origin(), cache.config().site.base_path_variable.clone())?);
        Ok(Self { cache, embed, origin_rewrite })
    }

    /// Rewrite the references of `html`, fetched from `page_url`.
    ///
    /// References are processed in document order. A reference whose
    /// resource is missing upstream is left untouched.
    pub async fn rewrite(&self, page_url: &Url, html: &str) -> Result<Rewritten, Error> {
        let site = &self.cache.config().site;
        let references = extract_references(html, page_url, &site.font_hosts);

        let mut replacements: HashMap<String, String> = HashMap::new();
        let mut blocked: HashSet<String> = HashSet::new();
        let mut outcomes = Vec::new();

        for reference in references {
            if reference.kind == ReferenceKind::Script && self.is_blocked(&reference) {
                tracing::info!(src = %reference.raw, "removing blocked script");
                blocked.insert(reference.raw);
                continue;
            }

            let request = self.request_for(&reference);
            match self.cache.cache(&request).await {
                Ok(cached) => {
                    tracing::debug!(from = %reference.raw, to = %cached.served_path, "rewriting reference");
                    outcomes.push(cached.outcome);
                    replacements.insert(reference.raw, cached.served_path);
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!(url = %reference.url, "referenced resource not found, leaving reference");
                    outcomes.push(Outcome::Skipped);
                }
                Err(e) => return Err(e),
            }
        }

        let removed = blocked.len();
        let html = apply_rewrites(html, &replacements, &blocked)?;
        Ok(Rewritten { html, outcomes, removed })
    }

    fn is_blocked(&self, reference: &Reference) -> bool {
        self.cache
            .config()
            .site
            .blocked_script_prefixes
            .iter()
            .any(|prefix| {
                reference.raw.starts_with(prefix.as_str()) || reference.url.path().starts_with(prefix.as_str())
            })
    }

    fn request_for(&self, reference: &Reference) -> ResourceRequest {
        match reference.kind {
            ReferenceKind::Stylesheet => {
                ResourceRequest::new(reference.url.clone(), CSS_PREFIX, ".css").with_transform(self.embed.clone())
            }
            ReferenceKind::Script => {
                let request = ResourceRequest::new(reference.url.clone(), JS_PREFIX, ".js");
                let name = LogicalName::from_url(&reference.url, ".js");
                if self.cache.config().site.interactive_scripts.contains(&name.stem) {
                    request.with_transform(self.origin_rewrite.clone())
                } else {
                    request
                }
            }
        }
    }
}

/// Mirror the entry document to `index.html`.
///
/// With cache reuse and an existing entry document nothing is fetched.
pub async fn mirror_entry(cache: Arc<ResourceCache>) -> Result<PhaseReport, Error> {
    let mut report = PhaseReport::new("document");
    let config = cache.config();
    let path = config.outdir.join(ENTRY_FILE);

    let exists = config.reuse_cache && tokio::fs::try_exists(&path).await.unwrap_or(false);
    if exists && !config.refresh {
        tracing::info!(path = %path.display(), "reusing entry document");
        report.record(Outcome::Reused);
        return Ok(report);
    }

    let entry = cache
        .origin()
        .join(config.site.entry_path.trim_start_matches('/'))
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.site.entry_path)))?;

    let result = async {
        let response = cache.fetcher().fetch(&entry).await?;
        let html = String::from_utf8_lossy(&response.bytes).into_owned();
        let rewritten = DocumentRewriter::new(cache.clone())?.rewrite(&entry, &html).await?;
        write_atomic(&path, rewritten.html.as_bytes()).await?;
        Ok::<_, Error>(rewritten)
    }
    .await;

    match result {
        Ok(rewritten) => {
            tracing::info!(
                url = %entry,
                path = %path.display(),
                references = rewritten.outcomes.len(),
                removed = rewritten.removed,
                "entry document rewritten"
            );
            report.record(Outcome::Fetched);
            rewritten.outcomes.into_iter().for_each(|o| report.record(o));
            Ok(report)
        }
        Err(e) if exists => {
            tracing::warn!(url = %entry, error = %e, "refresh of entry document failed, keeping cached copy");
            report.record(Outcome::Stale);
            Ok(report)
        }
        Err(e) => Err(e),
    }
}

fn lookup<'a>(map: &'a HashMap<String, String>, value: &str) -> Option<&'a String> {
    map.get(value).or_else(|| map.get(decode_html_entities(value).as_ref()))
}

fn is_listed(set: &HashSet<String>, value: &str) -> bool {
    set.contains(value) || set.contains(decode_html_entities(value).as_ref())
}

/// Apply reference replacements and script removals in one streaming pass.
fn apply_rewrites(
    html: &str,
    replacements: &HashMap<String, String>,
    blocked: &HashSet<String>,
) -> Result<String, Error> {
    if replacements.is_empty() && blocked.is_empty() {
        return Ok(html.to_string());
    }

    let mut output = Vec::with_capacity(html.len());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!(r#"link[rel="stylesheet"][href]"#, |el| {
                    if let Some(href) = el.get_attribute("href")
                        && let Some(path) = lookup(replacements, &href)
                    {
                        el.set_attribute("href", path)?;
                    }
                    Ok(())
                }),
                element!("script[src]", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        if is_listed(blocked, &src) {
                            el.remove();
                        } else if let Some(path) = lookup(replacements, &src) {
                            el.set_attribute("src", path)?;
                        }
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| Error::Html(format!("rewrite error: {e}")))?;
    rewriter
        .end()
        .map_err(|e| Error::Html(format!("rewrite finalization error: {e}")))?;

    String::from_utf8(output).map_err(|e| Error::Html(format!("invalid UTF-8 in rewritten document: {e}")))
}
