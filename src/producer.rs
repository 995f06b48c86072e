// Per-host snapshot producers. Each host agent serves its latest HostSnapshot as JSON.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;

use crate::models::HostSnapshot;

/// Anything that can hand over one host snapshot per collection tick.
pub trait SnapshotSource: Send + Sync {
    /// Label used in logs (usually the endpoint).
    fn name(&self) -> &str;

    fn fetch(&self) -> impl Future<Output = anyhow::Result<HostSnapshot>> + Send;
}

/// Pulls snapshots from a host agent over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProducer {
    url: String,
    client: reqwest::Client,
}

impl HttpProducer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotSource for HttpProducer {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> anyhow::Result<HostSnapshot> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?;

        if !response.status().is_success() {
            anyhow::bail!("{} responded with status: {}", self.url, response.status());
        }

        response
            .json::<HostSnapshot>()
            .await
            .with_context(|| format!("invalid snapshot payload from {}", self.url))
    }
}
