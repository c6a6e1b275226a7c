//! Retry policy with exponential backoff.
//!
//! The delay before retry `i` (0-indexed) is `base * 2^i`. Retries continue
//! until the request succeeds, yields a terminal outcome, or the optional
//! attempt limit is reached.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mapmirror_core::{AppConfig, Error};
use reqwest::Url;

use super::{FetchResponse, Fetcher};

/// Classified result of one attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    /// Success; stop.
    Done(T),
    /// The resource does not exist upstream; stop without retrying.
    NotFound(String),
    /// Transient failure; sleep and try again.
    Retry(Error),
    /// Non-transient failure; stop.
    Fail(Error),
}

impl<T> From<Result<T, Error>> for Attempt<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(value) => Attempt::Done(value),
            Err(Error::NotFound(url)) => Attempt::NotFound(url),
            Err(e) if e.is_retryable() => Attempt::Retry(e),
            Err(e) => Attempt::Fail(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Ceiling for a single delay.
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { base: Duration::from_millis(250), max_attempts: None, max_delay: None }
    }
}

impl From<&AppConfig> for RetryPolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            base: config.retry_base(),
            max_attempts: config.max_attempts,
            max_delay: config.max_delay_ms.map(Duration::from_millis),
        }
    }
}

impl RetryPolicy {
    /// Delay slept after failed attempt `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let delay = self.base.saturating_mul(factor);
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Drive `op` until it produces a terminal [`Attempt`].
    ///
    /// `op` receives the 0-indexed attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, Error>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op(attempt).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::NotFound(url) => return Err(Error::NotFound(url)),
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) => {
                    if let Some(max) = self.max_attempts
                        && attempt.saturating_add(1) >= max
                    {
                        tracing::warn!(target_url = label, attempts = max, error = %e, "giving up");
                        return Err(e);
                    }

                    let delay = self.delay(attempt);
                    tracing::warn!(
                        target_url = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}

/// A [`Fetcher`] wrapped in a [`RetryPolicy`].
///
/// Counts every request issued to the transport.
pub struct RetryingFetcher {
    inner: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    requests: AtomicU64,
}

impl RetryingFetcher {
    pub fn new(inner: Arc<dyn Fetcher>, policy: RetryPolicy) -> Self {
        Self { inner, policy, requests: AtomicU64::new(0) }
    }

    /// Fetch `url`, retrying transient failures.
    ///
    /// Returns [`Error::NotFound`] immediately on 404.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        self.policy
            .run(url.as_str(), move |_| async move {
                self.requests.fetch_add(1, Ordering::Relaxed);
                Attempt::from(self.inner.get(url).await)
            })
            .await
    }

    /// Number of requests issued so far.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}
