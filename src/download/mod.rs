use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::path::Path;

/// Fetches a remote file onto the local file system.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Downloads `url` to `dest`, returning the number of bytes written.
    async fn download<R: Runtime + 'static>(
        &self,
        runtime: &R,
        url: &str,
        dest: &Path,
    ) -> Result<u64>;
}

/// Downloader backed by [`HttpClient`].
pub struct HttpDownloader {
    http_client: HttpClient,
}

impl HttpDownloader {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    #[tracing::instrument(skip(self, runtime, dest))]
    async fn download<R: Runtime + 'static>(
        &self,
        runtime: &R,
        url: &str,
        dest: &Path,
    ) -> Result<u64> {
        info!("Downloading {}...", url);

        let bytes = self
            .http_client
            .download_file(url, || {
                runtime
                    .create_file(dest)
                    .with_context(|| format!("Failed to create download file at {:?}", dest))
            })
            .await?;

        info!("Download complete ({} bytes).", bytes);
        Ok(bytes)
    }
}
