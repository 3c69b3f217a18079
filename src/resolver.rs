//! Release catalog resolution: from a source link and a tag selector to one release
//! and its installable candidates.

use log::{debug, info, warn};
use std::fmt;
use std::str::FromStr;

use crate::asset::{CandidateFilter, Candidates};
use crate::error::{Error, Result};
use crate::provider::ReleaseProvider;
use crate::source::SourceLink;

const LATEST: &str = "latest";

/// Which release to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagSelector {
    /// Newest release that passes policy and filtering.
    #[default]
    Latest,
    /// Exactly this tag, prerelease or not.
    Tag(String),
}

impl From<&str> for TagSelector {
    fn from(s: &str) -> Self {
        if s == LATEST {
            TagSelector::Latest
        } else {
            TagSelector::Tag(s.to_string())
        }
    }
}

impl FromStr for TagSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl fmt::Display for TagSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSelector::Latest => f.write_str(LATEST),
            TagSelector::Tag(tag) => f.write_str(tag),
        }
    }
}

/// Release selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub allow_prerelease: bool,
    /// How many recent releases a "latest" search looks at. Always positive.
    pub release_depth: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allow_prerelease: false,
            release_depth: 50,
        }
    }
}

/// A resolved release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tag: String,
    pub candidates: Candidates,
    pub source: SourceLink,
}

pub struct ReleaseResolver<'a> {
    provider: &'a dyn ReleaseProvider,
    filter: &'a CandidateFilter,
    policy: Policy,
}

impl<'a> ReleaseResolver<'a> {
    pub fn new(provider: &'a dyn ReleaseProvider, filter: &'a CandidateFilter, policy: Policy) -> Self {
        Self {
            provider,
            filter,
            policy,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, source: &SourceLink, selector: &TagSelector) -> Result<Resolution> {
        match selector {
            TagSelector::Latest => self.resolve_latest(source).await,
            TagSelector::Tag(tag) => self.resolve_tag(source, tag).await,
        }
    }

    async fn resolve_latest(&self, source: &SourceLink) -> Result<Resolution> {
        let releases = self
            .provider
            .recent_releases(source.repo(), self.policy.release_depth)
            .await
            .map_err(|cause| Error::Provider {
                source_id: source.to_string(),
                cause,
            })?;

        if releases.is_empty() {
            return Err(Error::NoReleases(source.to_string()));
        }

        for release in releases {
            if release.prerelease && !self.policy.allow_prerelease {
                debug!("Skipping prerelease {}", release.tag);
                continue;
            }

            match self.filter.filter(&release.asset_urls()) {
                Ok(candidates) => {
                    info!("Resolved {} to release {}", source, release.tag);
                    return Ok(Resolution {
                        tag: release.tag,
                        candidates,
                        source: source.clone(),
                    });
                }
                Err(e) => warn!("Skipping release {}: {}", release.tag, e),
            }
        }

        Err(Error::NoValidRelease(source.to_string()))
    }

    async fn resolve_tag(&self, source: &SourceLink, tag: &str) -> Result<Resolution> {
        let release = self
            .provider
            .release_by_tag(source.repo(), tag)
            .await
            .map_err(|cause| Error::Provider {
                source_id: source.to_string(),
                cause,
            })?
            .ok_or_else(|| Error::ReleaseNotFound {
                source_id: source.to_string(),
                tag: tag.to_string(),
            })?;

        let candidates = self.filter.filter(&release.asset_urls())?;

        Ok(Resolution {
            tag: release.tag,
            candidates,
            source: source.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchAliases;
    use crate::provider::{MockReleaseProvider, Release, ReleaseAsset};
    use mockall::predicate::eq;

    fn source() -> SourceLink {
        SourceLink::parse("https://github.com/acme/tool").unwrap()
    }

    fn amd64_filter() -> CandidateFilter {
        CandidateFilter::new(ArchAliases::default(), "amd64")
    }

    fn release(tag: &str, prerelease: bool, files: &[&str]) -> Release {
        Release {
            tag: tag.to_string(),
            prerelease,
            assets: files
                .iter()
                .map(|f| ReleaseAsset {
                    name: Some(f.to_string()),
                    download_url: format!("https://dl/{}/{}", tag, f),
                })
                .collect(),
        }
    }

    fn provider_with(releases: Vec<Release>) -> MockReleaseProvider {
        let mut provider = MockReleaseProvider::new();
        provider
            .expect_recent_releases()
            .returning(move |_, _| Ok(releases.clone()));
        provider
    }

    #[test]
    fn test_tag_selector_parse() {
        assert_eq!("latest".parse::<TagSelector>().unwrap(), TagSelector::Latest);
        assert_eq!(
            "v1.0".parse::<TagSelector>().unwrap(),
            TagSelector::Tag("v1.0".into())
        );
        assert_eq!(TagSelector::Tag("v1.0".into()).to_string(), "v1.0");
    }

    #[tokio::test]
    async fn test_latest_picks_newest_single_candidate() {
        let provider = provider_with(vec![release("v2.0", false, &["tool_amd64.deb"])]);
        let filter = amd64_filter();
        let resolver = ReleaseResolver::new(&provider, &filter, Policy::default());

        let res = resolver.resolve(&source(), &TagSelector::Latest).await.unwrap();

        assert_eq!(res.tag, "v2.0");
        assert_eq!(
            res.candidates,
            Candidates::Single("https://dl/v2.0/tool_amd64.deb".into())
        );
        assert_eq!(res.source, source());
    }

    #[tokio::test]
    async fn test_latest_requests_configured_depth() {
        let mut provider = MockReleaseProvider::new();
        provider
            .expect_recent_releases()
            .with(eq(source().repo().clone()), eq(7))
            .times(1)
            .returning(|_, _| Ok(vec![release("v1", false, &["a.deb"])]));
        let filter = amd64_filter();
        let policy = Policy {
            allow_prerelease: false,
            release_depth: 7,
        };

        let res = ReleaseResolver::new(&provider, &filter, policy)
            .resolve(&source(), &TagSelector::Latest)
            .await
            .unwrap();
        assert_eq!(res.tag, "v1");
    }

    #[tokio::test]
    async fn test_latest_skips_prereleases_by_default() {
        let provider = provider_with(vec![
            release("v3.0-rc1", true, &["tool_amd64.deb"]),
            release("v2.0", false, &["tool_amd64.deb"]),
        ]);
        let filter = amd64_filter();

        let res = ReleaseResolver::new(&provider, &filter, Policy::default())
            .resolve(&source(), &TagSelector::Latest)
            .await
            .unwrap();
        assert_eq!(res.tag, "v2.0");
    }

    #[tokio::test]
    async fn test_latest_allows_prereleases_when_configured() {
        let provider = provider_with(vec![
            release("v3.0-rc1", true, &["tool_amd64.deb"]),
            release("v2.0", false, &["tool_amd64.deb"]),
        ]);
        let filter = amd64_filter();
        let policy = Policy {
            allow_prerelease: true,
            ..Policy::default()
        };

        let res = ReleaseResolver::new(&provider, &filter, policy)
            .resolve(&source(), &TagSelector::Latest)
            .await
            .unwrap();
        assert_eq!(res.tag, "v3.0-rc1");
    }

    #[test_log::test(tokio::test)]
    async fn test_latest_continues_past_filter_failures() {
        let provider = provider_with(vec![
            release("v3.0", false, &["tool.tar.gz"]),
            release("v2.1", false, &["tool_arm64.deb", "tool_i386.deb"]),
            release("v2.0", false, &["tool_arm64.deb", "tool_amd64.deb"]),
        ]);
        let filter = amd64_filter();

        let res = ReleaseResolver::new(&provider, &filter, Policy::default())
            .resolve(&source(), &TagSelector::Latest)
            .await
            .unwrap();
        assert_eq!(res.tag, "v2.0");
        assert_eq!(
            res.candidates,
            Candidates::Single("https://dl/v2.0/tool_amd64.deb".into())
        );
    }

    #[tokio::test]
    async fn test_latest_ambiguity_is_a_match() {
        let provider = provider_with(vec![release("v1", false, &["tool.deb", "tool-extra.deb"])]);
        let filter = amd64_filter();

        let res = ReleaseResolver::new(&provider, &filter, Policy::default())
            .resolve(&source(), &TagSelector::Latest)
            .await
            .unwrap();
        assert_eq!(
            res.candidates,
            Candidates::Ambiguous(vec![
                "https://dl/v1/tool-extra.deb".into(),
                "https://dl/v1/tool.deb".into(),
            ])
        );
    }

    #[tokio::test]
    async fn test_latest_no_releases() {
        let provider = provider_with(vec![]);
        let filter = amd64_filter();

        let err = ReleaseResolver::new(&provider, &filter, Policy::default())
            .resolve(&source(), &TagSelector::Latest)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoReleases(s) if s == "https://github.com/acme/tool"));
    }

    #[tokio::test]
    async fn test_latest_exhausted() {
        let provider = provider_with(vec![
            release("v2.0-rc", true, &["tool_amd64.deb"]),
            release("v1.0", false, &["tool.zip"]),
        ]);
        let filter = amd64_filter();

        let err = ReleaseResolver::new(&provider, &filter, Policy::default())
            .resolve(&source(), &TagSelector::Latest)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoValidRelease(_)));
    }

    #[tokio::test]
    async fn test_latest_provider_failure() {
        let mut provider = MockReleaseProvider::new();
        provider
            .expect_recent_releases()
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));
        let filter = amd64_filter();

        let err = ReleaseResolver::new(&provider, &filter, Policy::default())
            .resolve(&source(), &TagSelector::Latest)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("https://github.com/acme/tool"));
        assert!(msg.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_latest_is_stable_across_runs() {
        let provider = provider_with(vec![
            release("v1.1", false, &["tool_amd64.deb"]),
            release("v1.0", false, &["tool_amd64.deb"]),
        ]);
        let filter = amd64_filter();
        let resolver = ReleaseResolver::new(&provider, &filter, Policy::default());

        let first = resolver.resolve(&source(), &TagSelector::Latest).await.unwrap();
        let second = resolver.resolve(&source(), &TagSelector::Latest).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_explicit_prerelease_tag_is_allowed() {
        let mut provider = MockReleaseProvider::new();
        provider
            .expect_release_by_tag()
            .withf(|_, tag| tag == "v3.0-rc1")
            .returning(|_, _| Ok(Some(release("v3.0-rc1", true, &["tool_amd64.deb"]))));
        let filter = amd64_filter();

        let res = ReleaseResolver::new(&provider, &filter, Policy::default())
            .resolve(&source(), &TagSelector::Tag("v3.0-rc1".into()))
            .await
            .unwrap();
        assert_eq!(res.tag, "v3.0-rc1");
    }

    #[tokio::test]
    async fn test_explicit_tag_not_found() {
        let mut provider = MockReleaseProvider::new();
        provider.expect_release_by_tag().returning(|_, _| Ok(None));
        let filter = amd64_filter();

        let err = ReleaseResolver::new(&provider, &filter, Policy::default())
            .resolve(&source(), &TagSelector::Tag("v9".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReleaseNotFound { tag, .. } if tag == "v9"));
    }

    #[tokio::test]
    async fn test_explicit_tag_filter_failure_is_fatal() {
        let mut provider = MockReleaseProvider::new();
        provider
            .expect_release_by_tag()
            .returning(|_, _| Ok(Some(release("v1", false, &["tool_arm64.deb", "tool_i386.deb"]))));
        provider.expect_recent_releases().never();
        let filter = amd64_filter();

        let err = ReleaseResolver::new(&provider, &filter, Policy::default())
            .resolve(&source(), &TagSelector::Tag("v1".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoMatchForArchitecture(arch) if arch == "amd64"));
    }
}
