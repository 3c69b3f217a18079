use anyhow::Context;
use log::debug;
use std::path::{Path, PathBuf};

use crate::cleanup::{SharedCleanupContext, with_context};
use crate::error::{Error, Result};
use crate::runtime::Runtime;

const PREFIX: &str = "ghdeb-";

/// apt drops privileges to `_apt` while reading local packages.
const DIR_MODE: u32 = 0o755;

const FALLBACK_NAME: &str = "package.deb";

/// A uniquely named scratch directory, removed on [`WorkDir::close`] or drop.
pub struct WorkDir<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
    cleanup: SharedCleanupContext,
    closed: bool,
}

impl<'a, R: Runtime> WorkDir<'a, R> {
    pub fn create(runtime: &'a R, cleanup: SharedCleanupContext) -> Result<Self> {
        let path = runtime.create_work_dir(PREFIX).map_err(Error::WorkDir)?;

        if let Err(e) = runtime.set_permissions(&path, DIR_MODE) {
            let _ = runtime.remove_dir_all(&path);
            return Err(Error::WorkDir(e));
        }

        with_context(&cleanup, |c| c.add(path.clone()));
        debug!("Created working directory {:?}", path);

        Ok(Self {
            runtime,
            path,
            cleanup,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A free destination for the artifact at `url`, named after its last path segment.
    pub fn artifact_path(&self, url: &str) -> PathBuf {
        let name = url
            .split(['?', '#'])
            .next()
            .and_then(|u| u.rsplit('/').next())
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_NAME);

        let mut candidate = self.path.join(name);
        let mut n = 1;
        while self.runtime.exists(&candidate) {
            n += 1;
            candidate = self.path.join(format!("{}-{}", n, name));
        }
        candidate
    }

    /// Removes the directory and everything in it.
    pub fn close(mut self) -> anyhow::Result<()> {
        self.closed = true;
        self.unregister();
        self.runtime
            .remove_dir_all(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))
    }

    fn unregister(&self) {
        with_context(&self.cleanup, |c| c.remove(&self.path));
    }
}

impl<R: Runtime> Drop for WorkDir<'_, R> {
    fn drop(&mut self) {
        if !self.closed {
            self.unregister();
            let _ = self.runtime.remove_dir_all(&self.path);
        }
    }
}
