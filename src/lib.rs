//! Install and track Debian packages published as GitHub release assets.

pub mod arch;
pub mod asset;
pub mod cleanup;
pub mod commands;
pub mod download;
pub mod error;
pub mod http;
pub mod manager;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod source;
pub mod transaction;

pub use error::{Error, Result};
