//! Core types and shared functionality for mapmirror.
//!
//! This crate provides:
//! - Content-addressed cache primitives over a plain output directory
//! - Unified error types
//! - Run configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheIndex, FINGERPRINT_LEN, LogicalName, fingerprint};
pub use config::{AppConfig, Features, SiteLayout};
pub use error::Error;
