//! Bitmap producers.
//!
//! The worker pool never produces bitmaps itself. It hands download jobs to a
//! [`TileDownloader`] and render jobs to a [`TileRenderer`], both injected
//! through [`Producers`].

mod error;
mod http;
mod traits;

pub use error::ProducerError;
pub use http::{HttpClient, HttpTileDownloader, ReqwestClient, DEFAULT_HTTP_TIMEOUT};
pub use traits::{BoxFuture, Producers, TileDownloader, TileRenderer};

#[cfg(test)]
pub(crate) use http::tests::PNG_BYTES;
#[cfg(test)]
pub(crate) use traits::tests::{FailingRenderer, StubDownloader};
