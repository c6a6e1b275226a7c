//! Rewrite hardcoded origin URLs in scripts to a runtime base path.
//!
//! `"https://map.example.com/data/world.json"` becomes
//! `window.BASE_PATH + "/data/world.json"`, so the mirrored script works
//! under whatever path it is served from. Scheme-less (`//host`) and plain
//! `http` spellings of the origin are rewritten too.

use bytes::Bytes;
use mapmirror_core::Error;
use regex::{Captures, Regex};
use reqwest::Url;

use super::ContentTransform;

pub struct RewriteOrigin {
    pattern: Regex,
    variable: String,
}

impl RewriteOrigin {
    /// `variable` is a JS expression evaluating to the base path, without a
    /// trailing slash.
    pub fn new(origin: &Url, variable: impl Into<String>) -> Result<Self, Error> {
        let host = origin
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("origin has no host: {origin}")))?;
        let authority = match origin.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let pattern = Regex::new(&format!(r#"(["'`])(?:https?:)?//{}([/?#"'`])"#, regex::escape(&authority)))
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self { pattern, variable: variable.into() })
    }

    pub fn rewrite(&self, script: &str) -> String {
        self.pattern
            .replace_all(script, |caps: &Captures<'_>| format!("{} + {}{}", self.variable, &caps[1], &caps[2]))
            .into_owned()
    }
}

#[async_trait::async_trait]
impl ContentTransform for RewriteOrigin {
    fn name(&self) -> &'static str {
        "rewrite-origin"
    }

    async fn apply(&self, source: &Url, content: Bytes) -> Result<Bytes, Error> {
        let script = String::from_utf8_lossy(&content);
        let rewritten = self.rewrite(&script);
        if rewritten == script {
            tracing::debug!(url = %source, "no origin references to rewrite");
            return Ok(content);
        }
        Ok(Bytes::from(rewritten))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> RewriteOrigin {
        RewriteOrigin::new(&Url::parse("https://map.example.com/").unwrap(), "window.BASE_PATH").unwrap()
    }

    #[test]
    fn test_rewrites_double_and_single_quotes() {
        let js = r#"fetch("https://map.example.com/data/world.json"); var t = 'https://map.example.com/tiles/';"#;
        let out = rewriter().rewrite(js);
        assert_eq!(
            out,
            r#"fetch(window.BASE_PATH + "/data/world.json"); var t = window.BASE_PATH + '/tiles/';"#
        );
    }

    #[test]
    fn test_rewrites_template_literals_and_scheme_variants() {
        let js = "a(`https://map.example.com/z/${id}.json`); b(\"//map.example.com/x\"); c('http://map.example.com')";
        let out = rewriter().rewrite(js);
        assert_eq!(
            out,
            "a(window.BASE_PATH + `/z/${id}.json`); b(window.BASE_PATH + \"/x\"); c(window.BASE_PATH + '')"
        );
    }

    #[test]
    fn test_leaves_other_hosts_alone() {
        let js = r#"x("https://cdn.example.com/lib.js"); y("https://map.example.com.evil.net/")"#;
        let out = rewriter().rewrite(js);
        assert_eq!(out, js);
    }

    #[test]
    fn test_origin_with_port() {
        let rewriter = RewriteOrigin::new(&Url::parse("http://127.0.0.1:8080").unwrap(), "BASE").unwrap();
        assert_eq!(rewriter.rewrite(r#"u = "http://127.0.0.1:8080/a""#), r#"u = BASE + "/a""#);
        assert_eq!(rewriter.rewrite(r#"u = "http://127.0.0.1:9090/a""#), r#"u = "http://127.0.0.1:9090/a""#);
    }

    #[tokio::test]
    async fn test_apply_unchanged_returns_input() {
        let source = Url::parse("https://map.example.com/js/map.js").unwrap();
        let content = Bytes::from_static(b"console.log('hi')");
        let out = rewriter().apply(&source, content.clone()).await.unwrap();
        assert_eq!(out, content);
    }
}
