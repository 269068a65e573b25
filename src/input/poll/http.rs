//! HTTP fetcher for the REST backend.

use super::Fetcher;
use crate::error::{DashboardError, Result};
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

/// Per-request timeout. Exceeds the poll intervals, so a slow response can
/// land after a newer request was dispatched.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("[Poll] GET {}", url);
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DashboardError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.bytes().await?;
        Ok(body.to_vec())
    }
}
