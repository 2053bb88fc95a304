//! Byte sources for slices

use super::source::SliceLocation;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Produces the raw bytes of one slice.
///
/// The loader wraps every call in its own timeout, so implementations need
/// not bound their latency.
pub trait FetchSlice: Send + Sync + 'static {
    fn fetch(
        &self,
        location: &SliceLocation,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Default fetcher: in-memory bytes as-is, files through `tokio::fs`,
/// URLs through a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let http_error = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(http_error)?;
        Ok(body.to_vec())
    }
}

impl FetchSlice for HttpFetcher {
    async fn fetch(&self, location: &SliceLocation) -> Result<Vec<u8>, FetchError> {
        match location {
            SliceLocation::Bytes(bytes) => Ok(bytes.to_vec()),
            SliceLocation::Path(path) => {
                tokio::fs::read(path).await.map_err(|source| FetchError::Io {
                    path: path.clone(),
                    source,
                })
            }
            SliceLocation::Url(url) => self.get(url).await,
        }
    }
}
