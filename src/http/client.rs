//! HTTP client for fetching release archives.

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::io::Write;

use super::status::describe_status;
use crate::error::InstallError;

const USER_AGENT: &str = concat!("tooldrop/", env!("TOOLDROP_BUILD_VERSION"));

/// Thin wrapper around reqwest that reports every remote failure as
/// [`InstallError::Fetch`]. Nothing here retries.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client with the installer's user agent.
    pub fn with_defaults() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    /// Streams the body at `url` into the writer returned by `create_writer`.
    ///
    /// The writer is only created once the server has answered with a 2xx
    /// status, so failed requests never touch the file system. Returns the
    /// number of bytes written.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| InstallError::fetch(url, request_error_reason(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::fetch(url, describe_status(status)).into());
        }

        let expected_len = response.content_length();
        let mut response = response;
        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| InstallError::fetch(url, format!("transfer interrupted: {}", e)))?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        check_complete(url, expected_len, downloaded_bytes)?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}

fn request_error_reason(e: &reqwest::Error) -> String {
    if e.is_connect() {
        format!("connection failed: {}", e)
    } else if e.is_timeout() {
        format!("request timed out: {}", e)
    } else {
        e.to_string()
    }
}

/// A body shorter (or longer) than the announced Content-Length is a truncated transfer.
fn check_complete(url: &str, expected: Option<u64>, received: u64) -> Result<()> {
    match expected {
        Some(expected) if expected != received => Err(InstallError::fetch(
            url,
            format!(
                "truncated transfer: expected {} bytes, received {}",
                expected, received
            ),
        )
        .into()),
        _ => Ok(()),
    }
}
