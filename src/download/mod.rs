use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fetches a single artifact to a local path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Downloads `url` to `dest`. An existing file at `dest` is never overwritten.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

pub struct HttpDownloader<R: Runtime> {
    runtime: Arc<R>,
    http_client: HttpClient,
}

impl<R: Runtime> HttpDownloader<R> {
    pub fn new(runtime: Arc<R>, http_client: HttpClient) -> Self {
        Self {
            runtime,
            http_client,
        }
    }
}

#[async_trait]
impl<R: Runtime + 'static> Downloader for HttpDownloader<R> {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        if self.runtime.exists(dest) {
            bail!("Refusing to overwrite existing file {}", dest.display());
        }

        info!("Downloading {}...", url);

        let attempted = AtomicBool::new(false);
        let bytes = self
            .http_client
            .download_file(url, || {
                // A retried attempt starts over from an empty file.
                if attempted.swap(true, Ordering::SeqCst) && self.runtime.exists(dest) {
                    self.runtime.remove_file(dest)?;
                }
                self.runtime
                    .create_file(dest)
                    .with_context(|| format!("Failed to create {}", dest.display()))
            })
            .await;

        match bytes {
            Ok(bytes) => {
                info!("Downloaded {} bytes to {}", bytes, dest.display());
                Ok(())
            }
            Err(e) => {
                if self.runtime.exists(dest) {
                    let _ = self.runtime.remove_file(dest);
                }
                Err(e)
            }
        }
    }
}
