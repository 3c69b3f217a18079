use log::debug;
use std::sync::Arc;

use crate::{
    cleanup::spawn_interrupt_handler,
    error::Result,
    registry::InstalledRecord,
    resolver::TagSelector,
    runtime::Runtime,
    source::SourceLink,
};

use super::{
    Session,
    config::{Config, Settings},
    pick_candidate, require_privileges,
    services::Services,
};

/// Install the package published by `link` at release `tag` ("latest" by default).
#[tracing::instrument(skip(runtime, config))]
pub async fn install<R: Runtime + 'static>(
    runtime: Arc<R>,
    config: &Config,
    link: &str,
    tag: &str,
) -> Result<()> {
    let source = SourceLink::parse(link)?;
    require_privileges(runtime.as_ref(), "install")?;

    let settings = Settings::load_or_create(runtime.as_ref(), config)?;
    let services = Services::from_config(Arc::clone(&runtime), config)?;
    let session = Session::from_services(
        runtime.as_ref(),
        &config.config_dir,
        &services,
        settings.policy(),
    );

    let interrupt_handler = spawn_interrupt_handler(services.cleanup.clone());
    let result = run_install(&session, &source, &TagSelector::from(tag)).await;
    interrupt_handler.abort();

    match result? {
        Some(record) => println!(
            "Installed {} {} (package {})",
            record.source_link, record.installed_tag, record.system_package_name
        ),
        None => println!("{} is already installed", source),
    }
    Ok(())
}

/// Returns `None` when `source` is already tracked; nothing is changed then.
pub async fn run_install<R: Runtime>(
    session: &Session<'_, R>,
    source: &SourceLink,
    selector: &TagSelector,
) -> Result<Option<InstalledRecord>> {
    if let Some(existing) = session.registry.get(source)? {
        debug!("{} already tracked at {}", source, existing.installed_tag);
        return Ok(None);
    }

    println!("Resolving {} ({})...", source, selector);
    let resolution = session.resolver().resolve(source, selector).await?;
    let url = pick_candidate(session.runtime, &resolution.candidates)?;

    println!("Installing {} {} from {}", source, resolution.tag, url);
    let record = session
        .executor()
        .install(source, &resolution.tag, &url)
        .await?;

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchAliases;
    use crate::asset::CandidateFilter;
    use crate::cleanup::new_shared;
    use crate::download::MockDownloader;
    use crate::error::Error;
    use crate::manager::{ManagerStatus, MockPackageManager};
    use crate::provider::{MockReleaseProvider, Release, ReleaseAsset};
    use crate::registry::PackageRegistry;
    use crate::resolver::Policy;
    use crate::runtime::{MockRuntime, RealRuntime};

    fn source() -> SourceLink {
        SourceLink::parse("https://github.com/acme/tool").unwrap()
    }

    fn v2_release() -> Release {
        Release {
            tag: "v2.0".into(),
            prerelease: false,
            assets: vec![
                ReleaseAsset {
                    name: Some("tool_amd64.deb".into()),
                    download_url: "https://dl/v2.0/tool_amd64.deb".into(),
                },
                ReleaseAsset {
                    name: Some("checksums.txt".into()),
                    download_url: "https://dl/v2.0/checksums.txt".into(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_install_latest_on_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = RealRuntime;

        let mut provider = MockReleaseProvider::new();
        provider
            .expect_recent_releases()
            .returning(|_, _| Ok(vec![v2_release()]));
        let mut downloader = MockDownloader::new();
        downloader
            .expect_fetch()
            .withf(|url, _| url == "https://dl/v2.0/tool_amd64.deb")
            .times(1)
            .returning(|_, dest| Ok(std::fs::write(dest, "deb")?));
        let mut manager = MockPackageManager::new();
        manager
            .expect_package_name()
            .returning(|_| Ok("tool".into()));
        manager
            .expect_run()
            .times(1)
            .returning(|_, _| Ok(ManagerStatus::from_code(Some(0))));
        let filter = CandidateFilter::new(ArchAliases::default(), "amd64");

        let session = Session {
            runtime: &runtime,
            registry: PackageRegistry::new(&runtime, dir.path()),
            provider: &provider,
            downloader: &downloader,
            manager: &manager,
            filter: &filter,
            policy: Policy::default(),
            cleanup: new_shared(),
        };

        let record = run_install(&session, &source(), &TagSelector::Latest)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.installed_tag, "v2.0");
        let all = session.registry.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].installed_tag, "v2.0");
        assert_eq!(all[0].source_link, "https://github.com/acme/tool");
    }

    #[tokio::test]
    async fn test_install_already_tracked_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = RealRuntime;
        let registry = PackageRegistry::new(&runtime, dir.path());
        registry.upsert_installed(&source(), "tool", "v1.0").unwrap();

        let mut provider = MockReleaseProvider::new();
        provider.expect_recent_releases().never();
        provider.expect_release_by_tag().never();
        let downloader = MockDownloader::new();
        let manager = MockPackageManager::new();
        let filter = CandidateFilter::new(ArchAliases::default(), "amd64");

        let session = Session {
            runtime: &runtime,
            registry,
            provider: &provider,
            downloader: &downloader,
            manager: &manager,
            filter: &filter,
            policy: Policy::default(),
            cleanup: new_shared(),
        };

        let outcome = run_install(&session, &source(), &TagSelector::Latest)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(
            session.registry.get(&source()).unwrap().unwrap().installed_tag,
            "v1.0"
        );
    }

    #[tokio::test]
    async fn test_install_unknown_tag() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = RealRuntime;

        let mut provider = MockReleaseProvider::new();
        provider.expect_release_by_tag().returning(|_, _| Ok(None));
        let downloader = MockDownloader::new();
        let manager = MockPackageManager::new();
        let filter = CandidateFilter::new(ArchAliases::default(), "amd64");

        let session = Session {
            runtime: &runtime,
            registry: PackageRegistry::new(&runtime, dir.path()),
            provider: &provider,
            downloader: &downloader,
            manager: &manager,
            filter: &filter,
            policy: Policy::default(),
            cleanup: new_shared(),
        };

        let err = run_install(&session, &source(), &TagSelector::Tag("v9".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReleaseNotFound { .. }));
        assert!(session.registry.get_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_rejects_bad_link_before_privilege_check() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_privileged().never();
        let config = Config {
            config_dir: "/nonexistent".into(),
            api_url: "http://127.0.0.1:9".into(),
            token: None,
        };

        let err = install(Arc::new(runtime), &config, "https://gitlab.com/acme/tool", "latest")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedDomain(_)));
    }

    #[tokio::test]
    async fn test_install_requires_privileges() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_privileged().returning(|| false);
        runtime.expect_exists().never();
        let config = Config {
            config_dir: "/nonexistent".into(),
            api_url: "http://127.0.0.1:9".into(),
            token: None,
        };

        let err = install(Arc::new(runtime), &config, "github.com/acme/tool", "latest")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PrivilegeRequired("install")));
    }
}
