//! GitHub provider implementation.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use log::debug;

use crate::http::{HttpClient, is_not_found};

use super::{Release, ReleaseAsset, ReleaseProvider, RepoId};

/// GitHub never returns more than this many releases per page.
const MAX_PER_PAGE: usize = 100;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Release {
        pub tag_name: String,
        #[serde(default)]
        pub prerelease: bool,
        #[serde(default)]
        pub assets: Vec<Asset>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Asset {
        pub name: Option<String>,
        pub browser_download_url: String,
    }
}

pub struct GitHubProvider {
    http_client: HttpClient,
    api_url: String,
}

impl GitHubProvider {
    pub fn from_http_client(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn releases_url(&self, repo: &RepoId) -> String {
        format!("{}/repos/{}/{}/releases", self.api_url, repo.owner, repo.repo)
    }

    /// `releases/tags/{tag}`, with the tag percent-encoded as one path segment.
    fn tag_url(&self, repo: &RepoId, tag: &str) -> Result<Url> {
        let mut url = Url::parse(&self.releases_url(repo))
            .with_context(|| format!("Invalid API URL {}", self.api_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("API URL {} cannot carry a path", self.api_url))?
            .push("tags")
            .push(tag);
        Ok(url)
    }
}

#[async_trait]
impl ReleaseProvider for GitHubProvider {
    #[tracing::instrument(skip(self))]
    async fn recent_releases(&self, repo: &RepoId, depth: usize) -> Result<Vec<Release>> {
        let url = self.releases_url(repo);
        let per_page = depth.clamp(1, MAX_PER_PAGE);
        let mut releases: Vec<Release> = Vec::new();
        let mut page = 1;

        while releases.len() < depth {
            debug!("Fetching releases page {} from {}...", page, url);

            let parsed: Vec<api::Release> = self
                .http_client
                .get_json_with_query(
                    &url,
                    &[
                        ("per_page", &per_page.to_string()),
                        ("page", &page.to_string()),
                    ],
                )
                .await?;

            let short_page = parsed.len() < per_page;
            releases.extend(parsed.into_iter().map(Release::from));

            if short_page {
                break;
            }
            page += 1;
        }

        releases.truncate(depth);
        Ok(releases)
    }

    #[tracing::instrument(skip(self))]
    async fn release_by_tag(&self, repo: &RepoId, tag: &str) -> Result<Option<Release>> {
        let url = self.tag_url(repo, tag)?;
        debug!("Fetching release {} from {}...", tag, url);

        match self.http_client.get_json::<api::Release>(url.as_str()).await {
            Ok(release) => Ok(Some(release.into())),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl From<api::Release> for Release {
    fn from(r: api::Release) -> Self {
        Release {
            tag: r.tag_name,
            prerelease: r.prerelease,
            assets: r.assets.into_iter().map(ReleaseAsset::from).collect(),
        }
    }
}

impl From<api::Asset> for ReleaseAsset {
    fn from(a: api::Asset) -> Self {
        ReleaseAsset {
            name: a.name.filter(|n| !n.is_empty()),
            download_url: a.browser_download_url,
        }
    }
}
