//! Package manager capability.
//!
//! The executor never spawns processes itself; it asks a [`PackageManager`] to run an
//! action and looks at the reported status.

mod apt;

use anyhow::Result;
use std::fmt;
use std::path::Path;
use std::process::ExitStatus;

pub use apt::Apt;

/// Subcommands the executor needs from the system package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Remove,
    Purge,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Install => "install",
            Action::Remove => "remove",
            Action::Purge => "purge",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit status reported by a package manager run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStatus {
    code: Option<i32>,
}

impl ManagerStatus {
    /// `None` means the process was terminated by a signal.
    pub fn from_code(code: Option<i32>) -> Self {
        Self { code }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ManagerStatus {
    fn from(status: ExitStatus) -> Self {
        Self::from_code(status.code())
    }
}

impl fmt::Display for ManagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => f.write_str("terminated by signal"),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait PackageManager: Send + Sync {
    /// Runs `action` on `target` (an artifact path for installs, a package name otherwise),
    /// inheriting the operator's terminal.
    fn run(&self, action: Action, target: &str) -> Result<ManagerStatus>;

    /// Reads the package name recorded inside a downloaded artifact.
    fn package_name(&self, artifact: &Path) -> Result<String>;
}
