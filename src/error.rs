//! Error taxonomy shared by the resolver, registry and transaction executor.
//!
//! Collaborator plumbing (HTTP, filesystem, child processes) reports `anyhow::Error`;
//! those causes are folded into the variants below at the core boundary so that every
//! failure renders as one line naming the offending identifier and the cause chain.

use thiserror::Error;

use crate::manager::ManagerStatus;

#[derive(Error, Debug)]
pub enum Error {
    // Input errors: nothing has been touched yet.
    #[error("invalid source link '{link}': {reason}")]
    InvalidSource { link: String, reason: String },

    #[error("unsupported source scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("unsupported source domain '{0}'")]
    UnsupportedDomain(String),

    #[error("{0} requires root privileges")]
    PrivilegeRequired(&'static str),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    // Resolution errors.
    #[error("{0} has no releases available")]
    NoReleases(String),

    #[error("no valid release found for {0}")]
    NoValidRelease(String),

    #[error("release '{tag}' not found for {source_id}")]
    ReleaseNotFound { source_id: String, tag: String },

    #[error("no package files found")]
    NoPackageFiles,

    #[error("no package files for {0}")]
    NoMatchForArchitecture(String),

    // Registry lookups.
    #[error("{0} is not tracked in the registry")]
    NotTracked(String),

    #[error("{0} is not installed")]
    NotInstalled(String),

    // Operational errors.
    #[error("couldn't download {url}: {cause:#}")]
    DownloadFailed { url: String, cause: anyhow::Error },

    #[error("package manager failed ({status})")]
    ManagerInvocationFailed { status: ManagerStatus },

    #[error("couldn't run package manager: {0:#}")]
    ManagerUnavailable(anyhow::Error),

    #[error("working directory error: {0:#}")]
    WorkDir(anyhow::Error),

    #[error("registry error: {0:#}")]
    Registry(anyhow::Error),

    #[error("release provider error for {source_id}: {cause:#}")]
    Provider { source_id: String, cause: anyhow::Error },

    #[error("settings error: {0:#}")]
    Settings(anyhow::Error),

    #[error("{failed} of {total} package(s) failed")]
    BatchFailed { failed: usize, total: usize },
}

impl Error {
    /// Input errors are reported with a distinct exit code from runtime failures.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidSource { .. }
                | Error::UnsupportedScheme(_)
                | Error::UnsupportedDomain(_)
                | Error::PrivilegeRequired(_)
                | Error::InvalidSelection(_)
        )
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_input_error() { 2 } else { 1 }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
