//! HTTP transport implementation.
//!
//! [`HttpTransport`] talks to a real server with reqwest.
//! [`LoopbackTransport`] routes the same requests to an in-process
//! [`LoopbackServer`], which is useful for testing without a network.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::ModSyncTransport;
use modsync_core::{ModFileIndex, SyncPath};
use modsync_protocol::{
    decode_json, encode_fetch_path, hashes_query, HashesResponse, PathsResponse,
    VersionResponse, HASHES_PATH, PATHS_PATH, VERSION_HEADER, VERSION_PATH,
};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// HTTP-based ModSync transport.
///
/// Every request carries the `modsync-version` header. File bodies are
/// streamed to disk chunk by chunk; a fetch times out only while waiting
/// for the response or for the next chunk.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    client: reqwest::Client,
    client_version: String,
}

impl HttpTransport {
    /// Creates a transport for a server base URL.
    pub fn new(server_url: &str, client_version: impl Into<String>) -> SyncResult<Self> {
        let base_url = Url::parse(server_url)
            .map_err(|e| SyncError::transport_fatal(format!("invalid server url '{server_url}': {e}")))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SyncError::transport_fatal(e.to_string()))?;
        Ok(Self {
            base_url,
            client,
            client_version: client_version.into(),
        })
    }

    /// Creates a transport from a sync configuration.
    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        Self::new(&config.server_url, config.client_version.clone())
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, path_and_query: &str) -> SyncResult<Url> {
        self.base_url
            .join(path_and_query)
            .map_err(|e| SyncError::transport_fatal(format!("invalid request path '{path_and_query}': {e}")))
    }

    async fn send(
        &self,
        path_and_query: &str,
        timeout: Option<Duration>,
    ) -> SyncResult<reqwest::Response> {
        let request = self
            .client
            .get(self.url(path_and_query)?)
            .header(VERSION_HEADER, &self.client_version)
            .send();

        let response = match timeout {
            Some(timeout) => within(timeout, request).await?,
            None => request.await,
        }
        .map_err(map_reqwest)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::from_status(status.as_u16(), path_and_query, &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> SyncResult<T> {
        let bytes = self
            .send(path_and_query, None)
            .await?
            .bytes()
            .await
            .map_err(map_reqwest)?;
        Ok(decode_json(&bytes)?)
    }
}

/// Bounds one wait, leaving the rest of a transfer unbounded.
async fn within<F: Future>(timeout: Duration, future: F) -> SyncResult<F::Output> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| SyncError::Timeout)
}

fn map_reqwest(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::Timeout
    } else if err.is_builder() {
        SyncError::transport_fatal(err.to_string())
    } else {
        SyncError::transport_retryable(err.to_string())
    }
}

impl ModSyncTransport for HttpTransport {
    async fn version(&self) -> SyncResult<String> {
        self.get_json::<VersionResponse>(VERSION_PATH).await
    }

    async fn sync_paths(&self) -> SyncResult<Vec<SyncPath>> {
        self.get_json::<PathsResponse>(PATHS_PATH).await
    }

    async fn hashes(&self, sync_paths: &[String]) -> SyncResult<ModFileIndex> {
        let path = format!("{HASHES_PATH}{}", hashes_query(sync_paths));
        self.get_json::<HashesResponse>(&path).await
    }

    async fn fetch(&self, relative: &str, timeout: Duration, dest: &Path) -> SyncResult<u64> {
        let mut response = self
            .send(&encode_fetch_path(relative), Some(timeout))
            .await
            .map_err(|e| match e {
                SyncError::NotFound { .. } => SyncError::NotFound {
                    path: relative.to_string(),
                },
                other => other,
            })?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = within(timeout, response.chunk())
            .await?
            .map_err(map_reqwest)?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(path = %relative, bytes = written, "fetched");
        Ok(written)
    }
}

/// Response from a [`LoopbackServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackResponse {
    /// Status code.
    pub status: u16,
    /// Full response body.
    pub body: Vec<u8>,
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles a GET request for a path with optional query string.
    fn handle_get(
        &self,
        path_and_query: &str,
        client_version: &str,
    ) -> impl Future<Output = LoopbackResponse> + Send;
}

/// A transport that routes requests directly to an in-process server.
pub struct LoopbackTransport<S: LoopbackServer> {
    server: S,
    client_version: String,
}

impl<S: LoopbackServer> LoopbackTransport<S> {
    /// Creates a new loopback transport connected to the given server.
    pub fn new(server: S, client_version: impl Into<String>) -> Self {
        Self {
            server,
            client_version: client_version.into(),
        }
    }

    async fn get(&self, path_and_query: &str) -> SyncResult<Vec<u8>> {
        let response = self
            .server
            .handle_get(path_and_query, &self.client_version)
            .await;
        if (200..300).contains(&response.status) {
            Ok(response.body)
        } else {
            Err(SyncError::from_status(
                response.status,
                path_and_query,
                &String::from_utf8_lossy(&response.body),
            ))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> SyncResult<T> {
        Ok(decode_json(&self.get(path_and_query).await?)?)
    }
}

impl<S: LoopbackServer> ModSyncTransport for LoopbackTransport<S> {
    async fn version(&self) -> SyncResult<String> {
        self.get_json::<VersionResponse>(VERSION_PATH).await
    }

    async fn sync_paths(&self) -> SyncResult<Vec<SyncPath>> {
        self.get_json::<PathsResponse>(PATHS_PATH).await
    }

    async fn hashes(&self, sync_paths: &[String]) -> SyncResult<ModFileIndex> {
        let path = format!("{HASHES_PATH}{}", hashes_query(sync_paths));
        self.get_json::<HashesResponse>(&path).await
    }

    async fn fetch(&self, relative: &str, timeout: Duration, dest: &Path) -> SyncResult<u64> {
        let body = within(timeout, self.get(&encode_fetch_path(relative)))
            .await?
            .map_err(|e| match e {
                SyncError::NotFound { .. } => SyncError::NotFound {
                    path: relative.to_string(),
                },
                other => other,
            })?;
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}
