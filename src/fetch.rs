//! Boundary document download.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::config::Config;
use crate::error::{PipelineError, Result};

const USER_AGENT: &str = concat!("atlas-sweep/", env!("CARGO_PKG_VERSION"));

/// Downloads the administrative-boundary GeoJSON
pub struct BoundaryFetcher {
    client: Client,
}

impl BoundaryFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and write the body verbatim to `destination`, replacing
    /// any existing file. Returns the number of bytes written.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<u64> {
        info!("Downloading {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io(parent, e))?;
        }
        tokio::fs::write(destination, &body)
            .await
            .map_err(|e| PipelineError::io(destination, e))?;

        info!("Wrote {} bytes to {}", body.len(), destination.display());
        Ok(body.len() as u64)
    }
}

/// Fetch the configured boundary document, or keep the one on disk when
/// reuse is enabled. Returns the document path.
pub async fn fetch_boundaries(config: &Config, reuse_existing: bool) -> Result<PathBuf> {
    let destination = config.boundary_path();

    if reuse_existing && destination.exists() {
        info!(
            "Boundary file {} exists, skipping download",
            destination.display()
        );
        return Ok(destination);
    }

    BoundaryFetcher::new()?
        .fetch(&config.source.url, &destination)
        .await?;
    Ok(destination)
}
