//! Distribution install for javactl.
//!
//! Fetches the server distribution archive into the cache directory and
//! extracts it into the install directory. The mechanics are deliberately
//! thin: an HTTP GET with a bounded redirect chain, a cache-hit check, and
//! the system `tar` for extraction.
use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Redirect chains longer than this abort the download; a misbehaving
/// server must not loop us forever.
const MAX_REDIRECTS: usize = 5;

const DEFAULT_ARCHIVE_NAME: &str = "devserver-dist.tar.gz";

/// Downloads and unpacks the server distribution.
pub struct Installer {
    config: Config,
}

impl Installer {
    /// Creates an installer over the given configuration snapshot.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Fetches the distribution (skipping the download when the archive is
    /// already cached) and extracts it into the install directory.
    #[tracing::instrument(skip(self))]
    pub async fn install(&self) -> Result<()> {
        let archive = self.fetch().await?;
        self.extract(&archive).await?;
        tracing::info!(
            install_dir = %self.config.install_dir().display(),
            "Server distribution installed"
        );
        Ok(())
    }

    /// Downloads the archive into the cache directory, or reuses a cached
    /// copy.
    async fn fetch(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.config.cache_dir)
            .map_err(|e| Error::Install(format!("failed to create cache dir: {}", e)))?;

        let filename = self
            .config
            .distribution_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ARCHIVE_NAME);
        let dest = self.config.cache_dir.join(filename);

        if dest.exists() {
            tracing::info!(archive = %dest.display(), "Using cached distribution");
            return Ok(dest);
        }

        tracing::info!(url = %self.config.distribution_url, "Downloading distribution");
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| Error::Install(format!("failed to build HTTP client: {}", e)))?;

        let response = client
            .get(&self.config.distribution_url)
            .send()
            .await
            .map_err(|e| Error::Install(format!("download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Install(format!(
                "download failed with HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Install(format!("download interrupted: {}", e)))?;

        tokio::fs::write(&dest, &bytes)
            .await
            .map_err(|e| Error::Install(format!("failed to write archive: {}", e)))?;

        Ok(dest)
    }

    /// Unpacks the archive into the install directory via the system `tar`.
    async fn extract(&self, archive: &Path) -> Result<()> {
        let install_dir = self.config.install_dir();
        std::fs::create_dir_all(&install_dir)
            .map_err(|e| Error::Install(format!("failed to create install dir: {}", e)))?;

        let status = async_process::Command::new("tar")
            .arg("-xzf")
            .arg(archive)
            .arg("-C")
            .arg(&install_dir)
            .status()
            .await
            .map_err(|e| Error::Install(format!("failed to run tar: {}", e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Install(format!("tar exited with {}", status)))
        }
    }
}
