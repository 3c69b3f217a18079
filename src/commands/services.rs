//! Service factory for building command dependencies.
//!
//! Services are built from configuration values but are not part of the
//! configuration itself.

use std::sync::Arc;

use crate::{
    asset::CandidateFilter,
    cleanup::{SharedCleanupContext, new_shared},
    download::HttpDownloader,
    error::{Error, Result},
    http::HttpClient,
    manager::Apt,
    provider::GitHubProvider,
    runtime::Runtime,
};

use super::config::Config;

/// Build an HTTP client with the configured token
pub fn build_http_client(config: &Config) -> Result<HttpClient> {
    HttpClient::build(config.token.as_deref()).map_err(Error::Settings)
}

/// Everything a mutating command needs besides the registry.
pub struct Services<R: Runtime> {
    pub provider: GitHubProvider,
    pub downloader: HttpDownloader<R>,
    pub manager: Apt,
    pub filter: CandidateFilter,
    pub cleanup: SharedCleanupContext,
}

impl<R: Runtime> Services<R> {
    pub fn from_config(runtime: Arc<R>, config: &Config) -> Result<Self> {
        let http_client = build_http_client(config)?;

        Ok(Self {
            provider: GitHubProvider::from_http_client(http_client.clone(), &config.api_url),
            downloader: HttpDownloader::new(runtime, http_client),
            manager: Apt::new(),
            filter: CandidateFilter::for_host(),
            cleanup: new_shared(),
        })
    }
}
