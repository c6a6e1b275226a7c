//! In-memory transport for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use mapmirror_core::Error;
use reqwest::{StatusCode, Url};

use crate::fetch::{FetchResponse, Fetcher};

#[derive(Clone)]
struct Route {
    content_type: String,
    body: Bytes,
}

/// Serves canned responses keyed by absolute URL. Unknown URLs are 404.
#[derive(Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, Route>>,
    failures: Mutex<HashMap<String, (u16, usize)>>,
    hits: Mutex<HashMap<String, usize>>,
    requests: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, content_type: &str, body: impl Into<Bytes>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route { content_type: content_type.to_string(), body: body.into() });
    }

    /// Answer the next `times` requests for `url` with `status`.
    pub fn fail_next(&self, url: &str, status: u16, times: usize) {
        self.failures.lock().unwrap().insert(url.to_string(), (status, times));
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some((status, remaining)) = failures.get_mut(url.as_str())
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(Error::from_status(url.as_str(), *status));
            }
        }

        let route = self.routes.lock().unwrap().get(url.as_str()).cloned();
        match route {
            Some(route) => Ok(FetchResponse {
                url: url.clone(),
                status: StatusCode::OK,
                content_type: Some(route.content_type),
                bytes: route.body,
            }),
            None => Err(Error::NotFound(url.to_string())),
        }
    }
}
