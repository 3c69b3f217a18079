//! Release metadata providers.
//!
//! A provider answers two questions about a repository: "what are the most
//! recent releases" and "what does the release with this tag look like".

mod github;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use github::{DEFAULT_API_URL, GitHubProvider};

/// Repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A downloadable asset from a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: Option<String>,
    pub download_url: String,
}

/// A release from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Release {
    /// Version tag (e.g., "v1.0.0")
    pub tag: String,
    pub prerelease: bool,
    /// Downloadable assets, in the order the provider lists them
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    pub fn asset_urls(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.download_url.as_str()).collect()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseProvider: Send + Sync {
    /// Up to `depth` most recent releases, newest first.
    async fn recent_releases(&self, repo: &RepoId, depth: usize) -> Result<Vec<Release>>;

    /// The release tagged `tag`, or `None` when no such release exists.
    async fn release_by_tag(&self, repo: &RepoId, tag: &str) -> Result<Option<Release>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_display() {
        let repo = RepoId {
            owner: "owner".into(),
            repo: "repo".into(),
        };
        assert_eq!(repo.to_string(), "owner/repo");
    }

    #[test]
    fn test_asset_urls_keep_order() {
        let release = Release {
            tag: "v1".into(),
            prerelease: false,
            assets: vec![
                ReleaseAsset {
                    name: Some("b.deb".into()),
                    download_url: "https://x/b.deb".into(),
                },
                ReleaseAsset {
                    name: None,
                    download_url: "https://x/a.deb".into(),
                },
            ],
        };
        assert_eq!(release.asset_urls(), vec!["https://x/b.deb", "https://x/a.deb"]);
    }
}
