//! Source links: the identifier a package is tracked and re-resolved under.

use reqwest::Url;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::provider::RepoId;

const GITHUB_HOST: &str = "github.com";

/// A parsed and normalized source link, e.g. `https://github.com/acme/tool`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLink {
    repo: RepoId,
}

impl SourceLink {
    /// Parses an operator-supplied link.
    ///
    /// A missing scheme defaults to https. Anything after `owner/repo` in the path is
    /// ignored, as is a trailing `.git`, so every spelling of a repository maps to the
    /// same registry key.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&with_scheme).map_err(|e| Error::InvalidSource {
            link: raw.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url.host_str().unwrap_or_default();
        if host != GITHUB_HOST {
            return Err(Error::UnsupportedDomain(host.to_string()));
        }

        let mut segments = url.path().split('/').skip(1);
        let owner = segments.next().unwrap_or_default();
        let repo = segments
            .next()
            .map(|r| r.strip_suffix(".git").unwrap_or(r))
            .unwrap_or_default();

        if owner.is_empty() || repo.is_empty() {
            return Err(Error::InvalidSource {
                link: raw.to_string(),
                reason: "expected https://github.com/<owner>/<repo>".to_string(),
            });
        }

        Ok(Self {
            repo: RepoId {
                owner: owner.to_string(),
                repo: repo.to_string(),
            },
        })
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }
}

impl fmt::Display for SourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "https://{}/{}/{}",
            GITHUB_HOST, self.repo.owner, self.repo.repo
        )
    }
}

impl FromStr for SourceLink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
