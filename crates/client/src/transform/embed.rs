//! Inline stylesheet sub-resources as `data:` URIs.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures_util::future::try_join_all;
use mapmirror_core::Error;
use regex::{Captures, Regex};
use reqwest::Url;

use super::ContentTransform;
use crate::fetch::{RetryingFetcher, resolve};

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)"#).expect("invalid regex")
});

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

fn reference<'a>(caps: &'a Captures<'_>) -> &'a str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().trim())
        .unwrap_or("")
}

fn is_embeddable(reference: &str) -> bool {
    !reference.is_empty() && !reference.starts_with("data:") && !reference.starts_with('#')
}

/// Replaces every `url(...)` in a stylesheet with the referenced content.
///
/// Any failed sub-resource fetch fails the whole stylesheet; nothing is
/// partially inlined.
pub struct EmbedSubResources {
    fetcher: Arc<RetryingFetcher>,
}

impl EmbedSubResources {
    pub fn new(fetcher: Arc<RetryingFetcher>) -> Self {
        Self { fetcher }
    }

    async fn data_uri(&self, source: &Url, reference: &str) -> Result<String, Error> {
        let fail = |reason: String| Error::Transform { url: source.to_string(), reason };

        let url = resolve(source, reference).map_err(|e| fail(format!("{reference}: {e}")))?;
        let response = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| fail(format!("{reference}: {e}")))?;

        let media_type = response.media_type().unwrap_or(FALLBACK_MEDIA_TYPE);
        Ok(format!("data:{};base64,{}", media_type, STANDARD.encode(&response.bytes)))
    }
}

#[async_trait::async_trait]
impl ContentTransform for EmbedSubResources {
    fn name(&self) -> &'static str {
        "embed-sub-resources"
    }

    async fn apply(&self, source: &Url, content: Bytes) -> Result<Bytes, Error> {
        let text = String::from_utf8_lossy(&content).into_owned();

        let mut references: Vec<String> = Vec::new();
        for caps in CSS_URL.captures_iter(&text) {
            let r = reference(&caps);
            if is_embeddable(r) && !references.iter().any(|seen| seen == r) {
                references.push(r.to_string());
            }
        }

        if references.is_empty() {
            return Ok(content);
        }

        let uris = try_join_all(references.iter().map(|r| self.data_uri(source, r))).await?;
        let inlined: HashMap<&str, String> = references.iter().map(String::as_str).zip(uris).collect();

        let rewritten = CSS_URL.replace_all(&text, |caps: &Captures<'_>| match inlined.get(reference(caps)) {
            Some(uri) => format!("url({uri})"),
            None => caps[0].to_string(),
        });

        tracing::debug!(url = %source, embedded = inlined.len(), "inlined stylesheet sub-resources");

        Ok(Bytes::from(rewritten.into_owned()))
    }
}
