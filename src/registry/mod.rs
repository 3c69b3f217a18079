//! Package registry: the local record of packages installed from release assets.
//!
//! The registry is the only code that touches `installed.toml`. Every mutation
//! rewrites the whole file through a temporary sibling and a rename, so an
//! interrupted write leaves the previous contents in place.

mod record;

use anyhow::Context;
use log::debug;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::source::SourceLink;

pub use record::{InstalledRecord, Records};

pub const REGISTRY_FILE: &str = "installed.toml";

const FILE_MODE: u32 = 0o644;

pub struct PackageRegistry<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> PackageRegistry<'a, R> {
    /// Registry stored as `installed.toml` inside `dir`.
    pub fn new(runtime: &'a R, dir: &Path) -> Self {
        Self {
            runtime,
            path: dir.join(REGISTRY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, link: &SourceLink) -> Result<Option<InstalledRecord>> {
        Ok(self.load()?.remove(&link.to_string()))
    }

    /// All records, ordered by source link.
    pub fn get_all(&self) -> Result<Vec<InstalledRecord>> {
        Ok(self.load()?.into_values().collect())
    }

    /// Creates or replaces the record for `link`, dated today.
    pub fn upsert_installed(
        &self,
        link: &SourceLink,
        system_package_name: &str,
        tag: &str,
    ) -> Result<InstalledRecord> {
        let today = self.runtime.today();
        let record = InstalledRecord {
            source_link: link.to_string(),
            system_package_name: system_package_name.to_string(),
            installed_tag: tag.to_string(),
            install_date: today,
            last_update_date: today,
        };

        let mut records = self.load()?;
        records.insert(record.source_link.clone(), record.clone());
        self.store(&records)?;

        debug!("Marked {} as installed at {}", link, tag);
        Ok(record)
    }

    /// Moves an existing record to `tag`, leaving its install date alone.
    pub fn update_tag(&self, link: &SourceLink, tag: &str) -> Result<InstalledRecord> {
        let mut records = self.load()?;
        let record = records
            .get_mut(&link.to_string())
            .ok_or_else(|| Error::NotTracked(link.to_string()))?;

        record.installed_tag = tag.to_string();
        record.last_update_date = self.runtime.today();
        let updated = record.clone();

        self.store(&records)?;

        debug!("Updated {} to {}", link, tag);
        Ok(updated)
    }

    /// Drops the record for `link`. Returns whether one existed.
    pub fn remove(&self, link: &SourceLink) -> Result<bool> {
        let mut records = self.load()?;
        if records.remove(&link.to_string()).is_none() {
            return Ok(false);
        }

        self.store(&records)?;

        debug!("Unmarked {}", link);
        Ok(true)
    }

    fn load(&self) -> Result<Records> {
        if !self.runtime.exists(&self.path) {
            return Ok(Records::new());
        }

        let content = self
            .runtime
            .read_to_string(&self.path)
            .map_err(Error::Registry)?;

        record::decode(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
            .map_err(Error::Registry)
    }

    fn store(&self, records: &Records) -> Result<()> {
        self.write_atomically(records).map_err(Error::Registry)
    }

    fn write_atomically(&self, records: &Records) -> anyhow::Result<()> {
        let content = record::encode(records)?;

        if let Some(parent) = self.path.parent() {
            self.runtime.create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("toml.tmp");
        let result = self.replace_with(&tmp_path, content.as_bytes());
        if result.is_err() && self.runtime.exists(&tmp_path) {
            let _ = self.runtime.remove_file(&tmp_path);
        }
        result
    }

    fn replace_with(&self, tmp_path: &Path, content: &[u8]) -> anyhow::Result<()> {
        self.runtime
            .write(tmp_path, content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        self.runtime.set_permissions(tmp_path, FILE_MODE)?;
        self.runtime
            .rename(tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }
}
