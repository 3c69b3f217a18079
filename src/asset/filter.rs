use log::debug;

use crate::arch::ArchAliases;
use crate::error::{Error, Result};

/// Suffix of installable package files.
pub const PACKAGE_SUFFIX: &str = ".deb";

/// Outcome of a successful filtering pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// Exactly one artifact fits.
    Single(String),
    /// Several artifacts fit equally well, sorted lexicographically.
    /// The caller must pick one.
    Ambiguous(Vec<String>),
}

impl Candidates {
    fn from_urls(mut urls: Vec<String>) -> Self {
        if urls.len() == 1 {
            return Candidates::Single(urls.remove(0));
        }
        urls.sort();
        urls.dedup();
        if urls.len() == 1 {
            Candidates::Single(urls.remove(0))
        } else {
            Candidates::Ambiguous(urls)
        }
    }
}

/// Filters release assets by package format, then by host architecture.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    aliases: ArchAliases,
    host_arch: String,
}

impl CandidateFilter {
    pub fn new(aliases: ArchAliases, host_arch: impl Into<String>) -> Self {
        Self {
            aliases,
            host_arch: host_arch.into(),
        }
    }

    /// Filter for the running host with the built-in alias table.
    pub fn for_host() -> Self {
        Self::new(ArchAliases::default(), crate::arch::host_arch())
    }

    pub fn host_arch(&self) -> &str {
        &self.host_arch
    }

    /// Reduce `urls` to the candidates installable on this host.
    pub fn filter<S: AsRef<str>>(&self, urls: &[S]) -> Result<Candidates> {
        // Package-format pass
        let packages: Vec<String> = urls
            .iter()
            .map(|url| url.as_ref())
            .filter(|url| file_name(url).ends_with(PACKAGE_SUFFIX))
            .map(String::from)
            .collect();

        debug!(
            "{} of {} assets are package files",
            packages.len(),
            urls.len()
        );

        match packages.len() {
            0 => return Err(Error::NoPackageFiles),
            1 => return Ok(Candidates::from_urls(packages)),
            _ => {}
        }

        // Architecture pass. A release without any architecture marker is generic
        // and every package file stays a candidate.
        let arch_specific = packages.iter().any(|url| {
            let name = file_name(url).to_lowercase();
            self.aliases.all_aliases().any(|alias| name.contains(alias))
        });

        if !arch_specific {
            debug!("Release is architecture-generic");
            return Ok(Candidates::from_urls(packages));
        }

        let matching: Vec<String> = packages
            .into_iter()
            .filter(|url| {
                self.arches_in(file_name(url))
                    .iter()
                    .any(|arch| *arch == self.host_arch)
            })
            .collect();

        if matching.is_empty() {
            return Err(Error::NoMatchForArchitecture(self.host_arch.clone()));
        }

        Ok(Candidates::from_urls(matching))
    }

    /// Architectures named in a file name.
    ///
    /// An alias hit is ignored when a longer alias of another architecture starts at
    /// the same position, so `x86` does not claim `x86_64`.
    fn arches_in(&self, name: &str) -> Vec<&str> {
        let name = name.to_lowercase();
        let mut hits: Vec<(&str, usize, usize)> = Vec::new();

        for arch in self.aliases.arches() {
            for alias in self.aliases.aliases_for(arch) {
                for (start, _) in name.match_indices(alias.as_str()) {
                    hits.push((arch, start, alias.len()));
                }
            }
        }

        let mut arches: Vec<&str> = hits
            .iter()
            .filter(|(arch, start, len)| {
                !hits
                    .iter()
                    .any(|(other, s, l)| other != arch && s == start && l > len)
            })
            .map(|(arch, _, _)| *arch)
            .collect();
        arches.sort();
        arches.dedup();
        arches
    }
}

/// Final path segment of a URL, without query or fragment.
fn file_name(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    path.rsplit('/').next().unwrap_or(path)
}
