//! Command drivers behind the CLI.
//!
//! Each public command function validates its input, checks privileges, builds
//! the real services and hands off to a `run_*` function that works against a
//! [`Session`] of trait objects.

use std::path::Path;

use crate::{
    asset::{CandidateFilter, Candidates},
    cleanup::SharedCleanupContext,
    download::Downloader,
    error::{Error, Result},
    manager::PackageManager,
    provider::ReleaseProvider,
    registry::PackageRegistry,
    resolver::{Policy, ReleaseResolver},
    runtime::Runtime,
    transaction::Executor,
};

pub mod config;
mod install;
mod list;
mod remove;
pub mod services;
mod upgrade;

pub use install::{install, run_install};
pub use list::{format_records, list};
pub use remove::{remove, run_remove};
pub use upgrade::{BatchReport, UpgradeOutcome, run_upgrade, run_upgrade_all, upgrade, upgrade_all};

use services::Services;

/// Collaborators shared by the commands of one run.
pub struct Session<'a, R: Runtime> {
    pub runtime: &'a R,
    pub registry: PackageRegistry<'a, R>,
    pub provider: &'a dyn ReleaseProvider,
    pub downloader: &'a dyn Downloader,
    pub manager: &'a dyn PackageManager,
    pub filter: &'a CandidateFilter,
    pub policy: Policy,
    pub cleanup: SharedCleanupContext,
}

impl<'a, R: Runtime + 'static> Session<'a, R> {
    pub fn from_services(
        runtime: &'a R,
        config_dir: &Path,
        services: &'a Services<R>,
        policy: Policy,
    ) -> Self {
        Self {
            runtime,
            registry: PackageRegistry::new(runtime, config_dir),
            provider: &services.provider,
            downloader: &services.downloader,
            manager: &services.manager,
            filter: &services.filter,
            policy,
            cleanup: services.cleanup.clone(),
        }
    }
}

impl<'a, R: Runtime> Session<'a, R> {
    pub fn resolver(&self) -> ReleaseResolver<'_> {
        ReleaseResolver::new(self.provider, self.filter, self.policy)
    }

    pub fn executor(&self) -> Executor<'_, R> {
        Executor::new(
            self.runtime,
            &self.registry,
            self.downloader,
            self.manager,
            self.cleanup.clone(),
        )
    }
}

/// Fails unless the process may change system packages.
pub fn require_privileges<R: Runtime>(runtime: &R, action: &'static str) -> Result<()> {
    if runtime.is_privileged() {
        Ok(())
    } else {
        Err(Error::PrivilegeRequired(action))
    }
}

/// Turns a candidate set into one download URL, asking the operator when
/// several files fit equally well.
pub fn pick_candidate<R: Runtime>(runtime: &R, candidates: &Candidates) -> Result<String> {
    match candidates {
        Candidates::Single(url) => Ok(url.clone()),
        Candidates::Ambiguous(urls) => {
            let index = runtime
                .choose("Several package files match this system:", urls)
                .map_err(|e| Error::InvalidSelection(format!("{:#}", e)))?;
            urls.get(index)
                .cloned()
                .ok_or_else(|| Error::InvalidSelection(format!("{}", index + 1)))
        }
    }
}
