//! Transaction executor: download, package manager invocation and registry
//! bookkeeping for one package or a batch of upgrades.
//!
//! Every run owns a [`WorkDir`] that is removed once the package manager has
//! finished, whatever the outcome. Registry state that was committed before a
//! cleanup failure stays committed.

mod workdir;

use log::{debug, info, warn};
use std::path::PathBuf;

use crate::cleanup::{SharedCleanupContext, with_context};
use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::manager::{Action, PackageManager};
use crate::registry::{InstalledRecord, PackageRegistry};
use crate::runtime::Runtime;
use crate::source::SourceLink;

pub use workdir::WorkDir;

/// One resolved upgrade: move `source` from `from_tag` to `to_tag` using `artifact_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePlan {
    pub source: SourceLink,
    pub from_tag: String,
    pub to_tag: String,
    pub artifact_url: String,
}

pub struct Executor<'a, R: Runtime> {
    runtime: &'a R,
    registry: &'a PackageRegistry<'a, R>,
    downloader: &'a dyn Downloader,
    manager: &'a dyn PackageManager,
    cleanup: SharedCleanupContext,
}

impl<'a, R: Runtime> Executor<'a, R> {
    pub fn new(
        runtime: &'a R,
        registry: &'a PackageRegistry<'a, R>,
        downloader: &'a dyn Downloader,
        manager: &'a dyn PackageManager,
        cleanup: SharedCleanupContext,
    ) -> Self {
        Self {
            runtime,
            registry,
            downloader,
            manager,
            cleanup,
        }
    }

    /// First-time install of `artifact_url` as release `tag` of `source`.
    ///
    /// The registry mark is written before the package manager runs and taken
    /// back if it fails.
    #[tracing::instrument(skip(self))]
    pub async fn install(
        &self,
        source: &SourceLink,
        tag: &str,
        artifact_url: &str,
    ) -> Result<InstalledRecord> {
        let work = self.work_dir()?;
        let result = self.install_in(&work, source, tag, artifact_url).await;
        self.finish(work);
        result
    }

    async fn install_in(
        &self,
        work: &WorkDir<'_, R>,
        source: &SourceLink,
        tag: &str,
        artifact_url: &str,
    ) -> Result<InstalledRecord> {
        let artifact = self.download(work, artifact_url).await?;

        let package_name = self
            .manager
            .package_name(&artifact)
            .map_err(Error::ManagerUnavailable)?;
        debug!("{} provides package {}", artifact_url, package_name);

        let record = self.registry.upsert_installed(source, &package_name, tag)?;

        if let Err(e) = self.invoke(Action::Install, &artifact.to_string_lossy()) {
            if let Err(undo) = self.registry.remove(source) {
                warn!("Couldn't unmark {} after failed install: {}", source, undo);
            }
            return Err(e);
        }

        info!("Installed {} {} as {}", source, tag, package_name);
        Ok(record)
    }

    /// Upgrades one tracked package. The registry is only touched once the
    /// package manager succeeded.
    #[tracing::instrument(skip(self))]
    pub async fn upgrade(&self, plan: &UpgradePlan) -> Result<InstalledRecord> {
        let work = self.work_dir()?;
        let result = self.upgrade_in(&work, plan).await;
        self.finish(work);
        result
    }

    /// Runs every plan inside one shared working directory. A failing plan does
    /// not stop the ones after it; results come back in plan order.
    #[tracing::instrument(skip(self, plans))]
    pub async fn upgrade_batch(&self, plans: &[UpgradePlan]) -> Result<Vec<Result<InstalledRecord>>> {
        if plans.is_empty() {
            return Ok(Vec::new());
        }

        let work = self.work_dir()?;
        let mut results = Vec::with_capacity(plans.len());
        for plan in plans {
            let result = self.upgrade_in(&work, plan).await;
            if let Err(e) = &result {
                warn!("Upgrade of {} failed: {}", plan.source, e);
            }
            results.push(result);
        }
        self.finish(work);

        Ok(results)
    }

    async fn upgrade_in(&self, work: &WorkDir<'_, R>, plan: &UpgradePlan) -> Result<InstalledRecord> {
        let artifact = self.download(work, &plan.artifact_url).await?;

        self.invoke(Action::Install, &artifact.to_string_lossy())?;

        let record = self.registry.update_tag(&plan.source, &plan.to_tag)?;
        info!("Upgraded {} from {} to {}", plan.source, plan.from_tag, plan.to_tag);
        Ok(record)
    }

    fn work_dir(&self) -> Result<WorkDir<'a, R>> {
        WorkDir::create(self.runtime, self.cleanup.clone())
    }

    async fn download(&self, work: &WorkDir<'_, R>, url: &str) -> Result<PathBuf> {
        let dest = work.artifact_path(url);
        self.downloader
            .fetch(url, &dest)
            .await
            .map_err(|cause| Error::DownloadFailed {
                url: url.to_string(),
                cause,
            })?;
        Ok(dest)
    }

    fn invoke(&self, action: Action, target: &str) -> Result<()> {
        run_manager(self.manager, &self.cleanup, action, target)
    }

    fn finish(&self, work: WorkDir<'_, R>) {
        let path = work.path().to_path_buf();
        if let Err(e) = work.close() {
            warn!("Couldn't remove working directory {}: {:#}", path.display(), e);
        }
    }
}

/// Removes (or purges) a tracked package, then forgets it.
///
/// Removal downloads nothing, so it needs neither a working directory nor
/// release settings.
#[tracing::instrument(skip(registry, manager, cleanup))]
pub fn remove_package<R: Runtime>(
    registry: &PackageRegistry<'_, R>,
    manager: &dyn PackageManager,
    cleanup: &SharedCleanupContext,
    source: &SourceLink,
    purge: bool,
) -> Result<InstalledRecord> {
    let record = registry
        .get(source)?
        .ok_or_else(|| Error::NotInstalled(source.to_string()))?;

    let action = if purge { Action::Purge } else { Action::Remove };
    run_manager(manager, cleanup, action, &record.system_package_name)?;

    registry.remove(source)?;
    info!("Removed {} ({})", source, record.system_package_name);
    Ok(record)
}

/// Runs the package manager with interrupts deferred to it.
fn run_manager(
    manager: &dyn PackageManager,
    cleanup: &SharedCleanupContext,
    action: Action,
    target: &str,
) -> Result<()> {
    with_context(cleanup, |c| c.set_deferred(true));
    let status = manager.run(action, target);
    with_context(cleanup, |c| c.set_deferred(false));

    let status = status.map_err(Error::ManagerUnavailable)?;
    if !status.success() {
        return Err(Error::ManagerInvocationFailed { status });
    }
    Ok(())
}
