//! Runtime abstraction for system operations.
//!
//! This module provides a trait-based abstraction over system operations,
//! enabling dependency injection and testability.
//!
//! # Structure
//!
//! - `env` - Environment variables, privileges and the calendar date
//! - `fs` - File system operations (read, write, directories, work dirs)
//! - `user` - User interaction (numbered choice prompts)

mod env;
mod fs;
mod user;

use anyhow::Result;
use chrono::NaiveDate;
use std::env as std_env;
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Create a new file for writing. Fails if the path already exists.
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>>;

    /// Set file permissions (mode) on Unix systems.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;

    /// Create a fresh, uniquely named directory under the system temp dir.
    /// The directory is created exclusively and is never shared with another run.
    fn create_work_dir(&self, prefix: &str) -> Result<PathBuf>;

    // Privilege
    fn is_privileged(&self) -> bool;

    // Calendar
    fn today(&self) -> NaiveDate;

    // User interaction
    /// Present a numbered menu and return the zero-based index of the chosen option.
    fn choose(&self, prompt: &str, options: &[String]) -> Result<usize>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.rename_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.remove_dir_all_impl(path)
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        self.create_file_impl(path)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        self.set_permissions_impl(path, mode)
    }

    fn create_work_dir(&self, prefix: &str) -> Result<PathBuf> {
        self.create_work_dir_impl(prefix)
    }

    fn is_privileged(&self) -> bool {
        self.is_privileged_impl()
    }

    fn today(&self) -> NaiveDate {
        self.today_impl()
    }

    fn choose(&self, prompt: &str, options: &[String]) -> Result<usize> {
        self.choose_impl(prompt, options)
    }
}
