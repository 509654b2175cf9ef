//! Producer traits and the bundle the worker pool dispatches through.
//!
//! Both traits return boxed futures so they stay dyn-compatible and can be
//! injected as `Arc<dyn ...>`. Tests plug in stubs; the crate ships an HTTP
//! downloader and leaves rendering to the embedding application.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

use crate::job::{DownloadJob, Job, RenderJob};

use super::error::ProducerError;

/// A boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fetches encoded tile bitmaps from an online source.
pub trait TileDownloader: Send + Sync {
    /// Download the tile described by `job`.
    fn fetch<'a>(&'a self, job: &'a DownloadJob) -> BoxFuture<'a, Result<Bytes, ProducerError>>;
}

/// Renders tile bitmaps from local map data and a theme.
pub trait TileRenderer: Send + Sync {
    /// Render the tile described by `job`.
    fn render<'a>(&'a self, job: &'a RenderJob) -> BoxFuture<'a, Result<Bytes, ProducerError>>;
}

/// The producers available to a worker pool.
///
/// Either half may be absent; jobs of the missing kind fail with
/// `ProducerError::Unsupported`.
#[derive(Clone, Default)]
pub struct Producers {
    downloader: Option<Arc<dyn TileDownloader>>,
    renderer: Option<Arc<dyn TileRenderer>>,
}

impl Producers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_downloader(mut self, downloader: Arc<dyn TileDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn TileRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Produce the bitmap for any job, dispatching on its kind.
    pub async fn produce(&self, job: &Job) -> Result<Bytes, ProducerError> {
        match job {
            Job::Download(download) => match &self.downloader {
                Some(downloader) => downloader.fetch(download).await,
                None => Err(ProducerError::Unsupported(
                    "no downloader configured".to_string(),
                )),
            },
            Job::Render(render) => match &self.renderer {
                Some(renderer) => renderer.render(render).await,
                None => Err(ProducerError::Unsupported(
                    "no renderer configured".to_string(),
                )),
            },
        }
    }
}

impl std::fmt::Debug for Producers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producers")
            .field("downloader", &self.downloader.is_some())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}
