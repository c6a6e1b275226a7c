//! Harvest stylesheet and script references from an HTML document's head.

use scraper::{Html, Selector};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Stylesheet,
    Script,
}

/// A resource referenced by the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Attribute value as written in the document
    pub raw: String,
    /// Resolved absolute URL
    pub url: Url,
}

/// Extract `<link rel="stylesheet">` and `<script src>` references from the
/// document head, in document order.
///
/// Stylesheets served from `excluded_hosts` are left out, as are
/// references that do not resolve against `base_url`.
pub fn extract_references(html: &str, base_url: &Url, excluded_hosts: &[String]) -> Vec<Reference> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"head link[rel="stylesheet"][href], head script[src]"#).expect("invalid selector");

    let mut references = Vec::new();

    for element in document.select(&selector) {
        let (kind, attr) = match element.value().name() {
            "link" => (ReferenceKind::Stylesheet, "href"),
            _ => (ReferenceKind::Script, "src"),
        };

        let Some(raw) = element.value().attr(attr) else {
            continue;
        };

        let url = match base_url.join(raw.trim()) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(reference = raw, error = %e, "unresolvable reference, leaving as is");
                continue;
            }
        };

        if kind == ReferenceKind::Stylesheet
            && url.host_str().is_some_and(|host| excluded_hosts.iter().any(|h| h == host))
        {
            continue;
        }

        references.push(Reference { kind, raw: raw.to_string(), url });
    }

    references
}
