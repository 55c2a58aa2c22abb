//! CLI subcommands.

pub mod current;
pub mod list;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use kpfm_core::{Config, ConfigStore};

/// Loads the contexts file from `path` or the default location.
pub async fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let store = match path {
        Some(path) => ConfigStore::with_path(path),
        None => ConfigStore::new()?,
    };

    store
        .load()
        .await
        .with_context(|| format!("Cannot use {}", store.config_path().display()))
}
