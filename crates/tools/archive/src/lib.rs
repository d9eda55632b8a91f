//! HTTP archive fetcher for rigging.
//!
//! Downloads runtime dependency artifacts over HTTPS and places them on
//! disk. Supports:
//! - zip, tar, tar.gz, single-file gzip and raw binaries
//! - Extraction of a sub-path only, with the prefix stripped
//! - Rejecting HTML/XML error pages served in place of an artifact

mod extract;
mod sniff;

use async_trait::async_trait;
use reqwest::Client;
use rigging_core::{ArchiveFetcher, Error, FetchRequest, Result};
use tracing::{debug, info};

pub use extract::extract;
pub use sniff::{has_magic, looks_like_markup};

/// User agent sent with every download.
const USER_AGENT: &str = concat!("rigging/", env!("CARGO_PKG_VERSION"));

/// [`ArchiveFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpArchiveFetcher {
    client: Client,
}

impl HttpArchiveFetcher {
    /// Create a fetcher with a default client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (proxies, timeouts, custom roots).
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` into memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on connection failures and non-2xx
    /// responses.
    pub async fn download(&self, id: &str, url: &str) -> Result<Vec<u8>> {
        debug!(%id, %url, "Downloading artifact");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(id, url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(id, url, format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport(id, url, format!("failed to read body: {e}")))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn download_and_extract(&self, request: &FetchRequest<'_>) -> Result<()> {
        let payload = self.download(request.id, request.url).await?;
        info!(
            id = %request.id,
            url = %request.url,
            bytes = payload.len(),
            "Downloaded artifact"
        );
        extract(request, &payload)
    }
}
