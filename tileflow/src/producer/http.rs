//! HTTP tile downloader.
//!
//! Requests go through the [`HttpClient`] trait so tests can swap the network
//! for a mock. Each tile source gets one semaphore, created on first use with
//! the job's parallel-request limit; a limit of zero means no semaphore.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::job::DownloadJob;

use super::error::ProducerError;
use super::traits::{BoxFuture, TileDownloader};

/// Default request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimal async HTTP GET abstraction.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body or an error.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, ProducerError>>;
}

/// Real HTTP client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, ProducerError> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProducerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tileflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProducerError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, ProducerError>> {
        Box::pin(async move {
            trace!(url, "HTTP GET");
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ProducerError::Http(format!("Request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProducerError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            response
                .bytes()
                .await
                .map_err(|e| ProducerError::Http(format!("Failed to read response: {}", e)))
        })
    }
}

/// Downloads tiles from the source named in each job.
pub struct HttpTileDownloader<C: HttpClient = ReqwestClient> {
    client: C,
    limits: DashMap<String, Option<Arc<Semaphore>>>,
}

impl HttpTileDownloader<ReqwestClient> {
    /// Creates a downloader backed by reqwest.
    pub fn new() -> Result<Self, ProducerError> {
        Ok(Self::with_client(ReqwestClient::new()?))
    }
}

impl<C: HttpClient> HttpTileDownloader<C> {
    pub fn with_client(client: C) -> Self {
        Self {
            client,
            limits: DashMap::new(),
        }
    }

    fn semaphore_for(&self, job: &DownloadJob) -> Option<Arc<Semaphore>> {
        self.limits
            .entry(job.tile_source().identity_key())
            .or_insert_with(|| match job.parallel_requests_limit() {
                0 => None,
                limit => Some(Arc::new(Semaphore::new(limit))),
            })
            .clone()
    }

    async fn download(&self, job: &DownloadJob) -> Result<Bytes, ProducerError> {
        let tile = job.tile();
        let source = job.tile_source();
        if !source.supports_zoom(tile.zoom()) {
            return Err(ProducerError::Unsupported(format!(
                "{} serves zoom {}..={}, requested {}",
                source.name(),
                source.zoom_min(),
                source.zoom_max(),
                tile.zoom()
            )));
        }

        let _permit = match self.semaphore_for(job) {
            Some(semaphore) => Some(
                semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| ProducerError::Http("request limiter closed".to_string()))?,
            ),
            None => None,
        };

        let url = source.tile_url(&tile);
        let body = self.client.get(&url).await?;

        let format = image::guess_format(&body)
            .map_err(|e| ProducerError::Decode(format!("{} from {}", e, url)))?;
        debug!(tile = %tile, url = %url, bytes = body.len(), format = ?format, "Tile downloaded");
        Ok(body)
    }
}

impl<C: HttpClient> TileDownloader for HttpTileDownloader<C> {
    fn fetch<'a>(&'a self, job: &'a DownloadJob) -> BoxFuture<'a, Result<Bytes, ProducerError>> {
        Box::pin(self.download(job))
    }
}
