use log::debug;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Exit code for a run cut short by Ctrl-C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Tracks paths that need cleanup on interruption
#[derive(Default)]
pub struct CleanupContext {
    paths: Vec<PathBuf>,
    /// Set while a child process owns the terminal.
    deferred: bool,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path to be cleaned up on interruption
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Remove a path from the cleanup list once it has been dealt with
    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// While deferred, an interrupt is left to the foreground child process,
    /// whose failure then takes the ordinary error path.
    pub fn set_deferred(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Clean up all registered paths
    pub fn cleanup(&self) {
        for path in &self.paths {
            debug!("Cleaning up: {:?}", path);
            if path.is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

/// Type alias for shared cleanup context
pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

/// Create a new shared cleanup context
pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}

/// Runs `f` against the shared context, skipping it if the lock is poisoned.
pub fn with_context<F: FnOnce(&mut CleanupContext)>(ctx: &SharedCleanupContext, f: F) {
    if let Ok(mut guard) = ctx.lock() {
        f(&mut guard);
    }
}

/// Registers a Ctrl-C handler that removes every registered path and exits.
///
/// The handler stays armed until the returned task is aborted.
pub fn spawn_interrupt_handler(ctx: SharedCleanupContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        if wait_for_interrupt(&ctx, tokio::signal::ctrl_c).await {
            eprintln!("\nInterrupted, cleaning up...");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    })
}

/// Waits on `next_signal` until an interrupt arrives while nothing is deferred,
/// then cleans up and returns `true`. Returns `false` once signals stop.
async fn wait_for_interrupt<F, Fut>(ctx: &SharedCleanupContext, mut next_signal: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    while next_signal().await.is_ok() {
        let mut interrupted = false;
        with_context(ctx, |c| {
            if c.is_deferred() {
                debug!("Interrupt left to the package manager");
            } else {
                c.cleanup();
                interrupted = true;
            }
        });

        if interrupted {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cleanup_context_add_remove() {
        let mut ctx = CleanupContext::new();
        let path = PathBuf::from("/tmp/test");

        ctx.add(path.clone());
        assert_eq!(ctx.paths().len(), 1);

        ctx.remove(&path);
        assert!(ctx.paths().is_empty());
    }

    #[test]
    fn test_cleanup_context_cleanup_dirs() {
        let dir = tempdir().unwrap();
        let work_dir = dir.path().join("ghdeb-abc123");
        fs::create_dir(&work_dir).unwrap();
        fs::write(work_dir.join("tool_amd64.deb"), "deb").unwrap();

        let mut ctx = CleanupContext::new();
        ctx.add(work_dir.clone());

        ctx.cleanup();
        assert!(!work_dir.exists());
    }

    #[test]
    fn test_cleanup_context_cleanup_files() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.deb");
        fs::write(&file_path, "test").unwrap();

        let mut ctx = CleanupContext::new();
        ctx.add(file_path.clone());

        ctx.cleanup();
        assert!(!file_path.exists());
    }

    #[test]
    fn test_deferred_flag() {
        let ctx = new_shared();
        with_context(&ctx, |c| c.set_deferred(true));
        assert!(ctx.lock().unwrap().is_deferred());
        with_context(&ctx, |c| c.set_deferred(false));
        assert!(!ctx.lock().unwrap().is_deferred());
    }

    fn signals(
        ctx: SharedCleanupContext,
        count: usize,
        clear_deferred_after: Option<usize>,
    ) -> impl FnMut() -> std::future::Ready<io::Result<()>> {
        let mut delivered = 0;
        move || {
            if clear_deferred_after == Some(delivered) {
                with_context(&ctx, |c| c.set_deferred(false));
            }
            delivered += 1;
            std::future::ready(if delivered <= count {
                Ok(())
            } else {
                Err(io::Error::other("signal stream closed"))
            })
        }
    }

    #[tokio::test]
    async fn test_interrupt_cleans_up_work_dir() {
        let dir = tempdir().unwrap();
        let work_dir = dir.path().join("ghdeb-abc123");
        fs::create_dir(&work_dir).unwrap();
        let ctx = new_shared();
        with_context(&ctx, |c| c.add(work_dir.clone()));

        assert!(wait_for_interrupt(&ctx, signals(ctx.clone(), 1, None)).await);
        assert!(!work_dir.exists());
    }

    #[tokio::test]
    async fn test_interrupt_while_deferred_keeps_work_dir() {
        let dir = tempdir().unwrap();
        let work_dir = dir.path().join("ghdeb-abc123");
        fs::create_dir(&work_dir).unwrap();
        let ctx = new_shared();
        with_context(&ctx, |c| {
            c.add(work_dir.clone());
            c.set_deferred(true);
        });

        assert!(!wait_for_interrupt(&ctx, signals(ctx.clone(), 2, None)).await);
        assert!(work_dir.exists());
    }

    #[tokio::test]
    async fn test_interrupt_after_package_manager_returns() {
        let dir = tempdir().unwrap();
        let work_dir = dir.path().join("ghdeb-abc123");
        fs::create_dir(&work_dir).unwrap();
        let ctx = new_shared();
        with_context(&ctx, |c| {
            c.add(work_dir.clone());
            c.set_deferred(true);
        });

        // First signal arrives during apt, the second after it finished.
        assert!(wait_for_interrupt(&ctx, signals(ctx.clone(), 2, Some(1))).await);
        assert!(!work_dir.exists());
    }
}
