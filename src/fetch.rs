use std::time::Duration;
use anyhow::Context;
use thiserror::Error;
use crate::worker::WorkerConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{url} timed out")]
    Timeout { url: String },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {source}")]
    Request { url: String, #[source] source: reqwest::Error },
}

/// Supplies raw page or PDF bytes for a url.
#[rocket::async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &WorkerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .user_agent(cfg.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[rocket::async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.to_string() }
            } else {
                FetchError::Request { url: url.to_string(), source: e }
            }
        };
        debug!("GET {url}");
        let resp = self.client.get(url).send().await.map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() })
        }
        let bytes = resp.bytes().await.map_err(classify)?;
        Ok(bytes.to_vec())
    }
}
