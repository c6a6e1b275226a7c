//! Fetch, cache and rewrite pipeline for mapmirror.
//!
//! This crate provides the retrying HTTP fetcher, the content-addressed
//! resource cache, the entry document rewriter and the bulk enumerator
//! used by the CLI to build a static mirror.

pub mod document;
pub mod enumerate;
pub mod fetch;
pub mod mirror;
pub mod pool;
pub mod report;
pub mod resource;
pub mod transform;

#[cfg(test)]
mod testing;

pub use document::{DocumentRewriter, ENTRY_FILE, mirror_entry};
pub use enumerate::Enumerator;
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher, RetryPolicy, RetryingFetcher};
pub use mirror::Mirror;
pub use report::{Outcome, PhaseReport, RunReport};
pub use resource::{Cached, ResourceCache, ResourceRequest};
