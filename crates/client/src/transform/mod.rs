//! Post-fetch content transforms.
//!
//! A transform runs on the fetched bytes before they are fingerprinted, so
//! the fingerprint always describes what ends up on disk.

pub mod embed;
pub mod origin;

pub use embed::EmbedSubResources;
pub use origin::RewriteOrigin;

use bytes::Bytes;
use mapmirror_core::Error;
use reqwest::Url;

#[async_trait::async_trait]
pub trait ContentTransform: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transform `content` fetched from `source`.
    async fn apply(&self, source: &Url, content: Bytes) -> Result<Bytes, Error>;
}
