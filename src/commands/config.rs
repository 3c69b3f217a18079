//! Run configuration: where state lives, which API to talk to, and the
//! operator's release policy from `config.toml`.

use anyhow::Context;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::provider::DEFAULT_API_URL;
use crate::resolver::Policy;
use crate::runtime::Runtime;

pub const DEFAULT_CONFIG_DIR: &str = "/etc/ghdeb";
pub const SETTINGS_FILE: &str = "config.toml";

/// Where and how a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `config.toml` and `installed.toml`
    pub config_dir: PathBuf,
    pub api_url: String,
    /// GitHub token for authentication (from GITHUB_TOKEN env var)
    pub token: Option<String>,
}

impl Config {
    pub fn load<R: Runtime>(
        runtime: &R,
        config_dir: Option<PathBuf>,
        api_url: Option<String>,
    ) -> Self {
        let token = runtime
            .env_var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        if token.is_some() {
            debug!("Using GITHUB_TOKEN for authentication");
        }

        Self {
            config_dir: config_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token,
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }
}

/// Operator policy stored under `[ghdeb]` in `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub allow_prerelease: bool,
    pub release_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let policy = Policy::default();
        Self {
            allow_prerelease: policy.allow_prerelease,
            release_depth: policy.release_depth,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    ghdeb: Settings,
}

impl Settings {
    /// Reads the settings file, falling back to defaults when it does not exist.
    pub fn load<R: Runtime>(runtime: &R, config: &Config) -> Result<Self> {
        let path = config.settings_path();
        if !runtime.exists(&path) {
            debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = runtime.read_to_string(&path).map_err(Error::Settings)?;
        let file: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
            .map_err(Error::Settings)?;

        file.ghdeb.validated()
    }

    /// Like [`Settings::load`], but writes a default file on first use.
    pub fn load_or_create<R: Runtime>(runtime: &R, config: &Config) -> Result<Self> {
        let path = config.settings_path();
        if !runtime.exists(&path) {
            Self::write_default(runtime, &config.config_dir, &path).map_err(Error::Settings)?;
            info!("Created default settings at {}", path.display());
        }
        Self::load(runtime, config)
    }

    pub fn policy(&self) -> Policy {
        Policy {
            allow_prerelease: self.allow_prerelease,
            release_depth: self.release_depth,
        }
    }

    fn validated(self) -> Result<Self> {
        if self.release_depth == 0 {
            return Err(Error::Settings(anyhow::anyhow!(
                "releaseDepth must be a positive number"
            )));
        }
        Ok(self)
    }

    fn write_default<R: Runtime>(runtime: &R, dir: &Path, path: &Path) -> anyhow::Result<()> {
        runtime
            .create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let content = toml::to_string(&SettingsFile::default())?;
        runtime
            .write(path, content.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
