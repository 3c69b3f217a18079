use log::warn;
use std::sync::Arc;

use crate::{
    cleanup::spawn_interrupt_handler,
    error::{Error, Result},
    registry::InstalledRecord,
    resolver::TagSelector,
    runtime::Runtime,
    source::SourceLink,
    transaction::UpgradePlan,
};

use super::{
    Session,
    config::{Config, Settings},
    pick_candidate, require_privileges,
    services::Services,
};

#[derive(Debug)]
pub enum UpgradeOutcome {
    Upgraded { from: String, record: InstalledRecord },
    AlreadyCurrent { tag: String },
}

/// Per-package results of an `upgrade-all` run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub upgraded: Vec<(String, String, String)>,
    pub current: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.upgraded.len() + self.current.len() + self.failed.len()
    }

    pub fn print(&self) {
        for (link, from, to) in &self.upgraded {
            println!("upgraded  {} {} -> {}", link, from, to);
        }
        for link in &self.current {
            println!("current   {}", link);
        }
        for (link, e) in &self.failed {
            println!("failed    {}: {}", link, e);
        }
        println!(
            "{} upgraded, {} already current, {} failed",
            self.upgraded.len(),
            self.current.len(),
            self.failed.len()
        );
    }
}

/// Upgrade each named package to its latest release.
///
/// Every link is attempted. With several links, failures are listed once all
/// are done and reported together.
#[tracing::instrument(skip(runtime, config))]
pub async fn upgrade<R: Runtime + 'static>(
    runtime: Arc<R>,
    config: &Config,
    links: &[String],
) -> Result<()> {
    let sources = links
        .iter()
        .map(|l| SourceLink::parse(l))
        .collect::<Result<Vec<_>>>()?;
    require_privileges(runtime.as_ref(), "upgrade")?;

    let settings = Settings::load_or_create(runtime.as_ref(), config)?;
    let services = Services::from_config(Arc::clone(&runtime), config)?;
    let session = Session::from_services(
        runtime.as_ref(),
        &config.config_dir,
        &services,
        settings.policy(),
    );

    let interrupt_handler = spawn_interrupt_handler(services.cleanup.clone());
    let mut errors = Vec::new();
    for source in &sources {
        match run_upgrade(&session, source).await {
            Ok(UpgradeOutcome::Upgraded { from, record }) => {
                println!("Upgraded {} {} -> {}", source, from, record.installed_tag)
            }
            Ok(UpgradeOutcome::AlreadyCurrent { tag }) => {
                println!("{} is already at the latest version ({})", source, tag)
            }
            Err(e) => errors.push((source, e)),
        }
    }
    interrupt_handler.abort();

    if errors.len() == 1 && sources.len() == 1 {
        let (_, e) = errors.remove(0);
        return Err(e);
    }
    if errors.is_empty() {
        return Ok(());
    }
    for (source, e) in &errors {
        eprintln!("failed    {}: {}", source, e);
    }
    Err(Error::BatchFailed {
        failed: errors.len(),
        total: sources.len(),
    })
}

/// Upgrade every tracked package, sharing one working directory.
#[tracing::instrument(skip(runtime, config))]
pub async fn upgrade_all<R: Runtime + 'static>(runtime: Arc<R>, config: &Config) -> Result<()> {
    require_privileges(runtime.as_ref(), "upgrade-all")?;

    let settings = Settings::load_or_create(runtime.as_ref(), config)?;
    let services = Services::from_config(Arc::clone(&runtime), config)?;
    let session = Session::from_services(
        runtime.as_ref(),
        &config.config_dir,
        &services,
        settings.policy(),
    );

    let interrupt_handler = spawn_interrupt_handler(services.cleanup.clone());
    let result = run_upgrade_all(&session).await;
    interrupt_handler.abort();

    let report = result?;
    if report.total() == 0 {
        println!("No packages installed.");
        return Ok(());
    }
    report.print();

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(Error::BatchFailed {
            failed: report.failed.len(),
            total: report.total(),
        })
    }
}

pub async fn run_upgrade<R: Runtime>(
    session: &Session<'_, R>,
    source: &SourceLink,
) -> Result<UpgradeOutcome> {
    let record = session
        .registry
        .get(source)?
        .ok_or_else(|| Error::NotInstalled(source.to_string()))?;

    let resolution = session
        .resolver()
        .resolve(source, &TagSelector::Latest)
        .await?;

    if resolution.tag == record.installed_tag {
        return Ok(UpgradeOutcome::AlreadyCurrent {
            tag: record.installed_tag,
        });
    }

    let plan = UpgradePlan {
        source: source.clone(),
        from_tag: record.installed_tag,
        to_tag: resolution.tag,
        artifact_url: pick_candidate(session.runtime, &resolution.candidates)?,
    };
    let record = session.executor().upgrade(&plan).await?;

    Ok(UpgradeOutcome::Upgraded {
        from: plan.from_tag,
        record,
    })
}

/// Resolves every record first, then upgrades the out-of-date ones in one batch.
pub async fn run_upgrade_all<R: Runtime>(session: &Session<'_, R>) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let mut plans = Vec::new();

    for record in session.registry.get_all()? {
        match plan_upgrade(session, &record).await {
            Ok(Some(plan)) => plans.push(plan),
            Ok(None) => report.current.push(record.source_link),
            Err(e) => {
                warn!("Couldn't resolve {}: {}", record.source_link, e);
                report.failed.push((record.source_link, e));
            }
        }
    }

    let results = session.executor().upgrade_batch(&plans).await?;
    for (plan, result) in plans.into_iter().zip(results) {
        let link = plan.source.to_string();
        match result {
            Ok(record) => report
                .upgraded
                .push((link, plan.from_tag, record.installed_tag)),
            Err(e) => report.failed.push((link, e)),
        }
    }

    Ok(report)
}

async fn plan_upgrade<R: Runtime>(
    session: &Session<'_, R>,
    record: &InstalledRecord,
) -> Result<Option<UpgradePlan>> {
    let source = SourceLink::parse(&record.source_link)?;
    let resolution = session
        .resolver()
        .resolve(&source, &TagSelector::Latest)
        .await?;

    if resolution.tag == record.installed_tag {
        return Ok(None);
    }

    Ok(Some(UpgradePlan {
        artifact_url: pick_candidate(session.runtime, &resolution.candidates)?,
        source,
        from_tag: record.installed_tag.clone(),
        to_tag: resolution.tag,
    }))
}
