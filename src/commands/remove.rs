use std::sync::Arc;

use crate::{
    cleanup::{SharedCleanupContext, new_shared, spawn_interrupt_handler},
    error::Result,
    manager::{Apt, PackageManager},
    registry::{InstalledRecord, PackageRegistry},
    runtime::Runtime,
    source::SourceLink,
    transaction::remove_package,
};

use super::{config::Config, require_privileges};

/// Remove (or purge, with `purge`) a package that was installed through ghdeb.
///
/// Only the registry and apt are involved, so a broken `config.toml` or an
/// unreachable API never stands in the way of uninstalling.
#[tracing::instrument(skip(runtime, config))]
pub async fn remove<R: Runtime + 'static>(
    runtime: Arc<R>,
    config: &Config,
    link: &str,
    purge: bool,
) -> Result<()> {
    let source = SourceLink::parse(link)?;
    require_privileges(runtime.as_ref(), if purge { "purge" } else { "remove" })?;

    let registry = PackageRegistry::new(runtime.as_ref(), &config.config_dir);
    let manager = Apt::new();
    let cleanup = new_shared();

    let interrupt_handler = spawn_interrupt_handler(cleanup.clone());
    let result = run_remove(&registry, &manager, &cleanup, &source, purge);
    interrupt_handler.abort();

    let record = result?;
    println!(
        "{} {} (package {})",
        if purge { "Purged" } else { "Removed" },
        record.source_link,
        record.system_package_name
    );
    Ok(())
}

pub fn run_remove<R: Runtime>(
    registry: &PackageRegistry<'_, R>,
    manager: &dyn PackageManager,
    cleanup: &SharedCleanupContext,
    source: &SourceLink,
    purge: bool,
) -> Result<InstalledRecord> {
    remove_package(registry, manager, cleanup, source, purge)
}
