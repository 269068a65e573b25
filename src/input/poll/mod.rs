//! Pull source: fixed-interval polling of the REST backend.
//!
//! The fetcher only knows how to GET a URL. Scheduling, sequence tagging and
//! applying the responses belong to the view runtime and the reconciler.

mod http;

pub use http::HttpFetcher;

use crate::error::Result;
use async_trait::async_trait;

/// Issues one request and returns the response body.
///
/// Non-2xx responses must be reported as errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
