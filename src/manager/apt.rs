use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{Action, ManagerStatus, PackageManager};

const APT: &str = "/usr/bin/apt";
const DPKG_DEB: &str = "/usr/bin/dpkg-deb";

/// apt for installs and removals, dpkg-deb for reading artifact metadata.
pub struct Apt {
    apt: PathBuf,
    dpkg_deb: PathBuf,
}

impl Default for Apt {
    fn default() -> Self {
        Self::with_binaries(APT, DPKG_DEB)
    }
}

impl Apt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binaries(apt: impl Into<PathBuf>, dpkg_deb: impl Into<PathBuf>) -> Self {
        Self {
            apt: apt.into(),
            dpkg_deb: dpkg_deb.into(),
        }
    }
}

impl PackageManager for Apt {
    fn run(&self, action: Action, target: &str) -> Result<ManagerStatus> {
        let mut cmd = Command::new(&self.apt);
        cmd.arg(action.as_str())
            .arg(target)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        info!("Running {} {} {}", self.apt.display(), action, target);
        debug!("Package manager command: {:?}", cmd);

        let status = cmd
            .status()
            .with_context(|| format!("Failed to execute {}", self.apt.display()))?;

        Ok(status.into())
    }

    fn package_name(&self, artifact: &Path) -> Result<String> {
        let output = Command::new(&self.dpkg_deb)
            .arg("--field")
            .arg(artifact)
            .arg("Package")
            .output()
            .with_context(|| format!("Failed to execute {}", self.dpkg_deb.display()))?;

        if !output.status.success() {
            bail!(
                "dpkg-deb could not read {}: {}",
                artifact.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if name.is_empty() {
            bail!("{} does not declare a package name", artifact.display());
        }
        Ok(name)
    }
}
