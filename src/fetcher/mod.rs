pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

/// Abstraction over HTTP retrieval so the hub and the classifier can be
/// driven by canned responses in tests.
#[async_trait]
pub trait Fetcher {
    /// Fetch the document at `url` as text. Non-2xx responses are errors.
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Fetch the resource at `url` as raw bytes (thumbnail probing).
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}
