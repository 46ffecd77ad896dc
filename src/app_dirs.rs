//! Cache directory helpers anchored to a single `wavetank` folder.
//!
//! Cache files written by the store live under the OS cache directory by
//! default (e.g., `~/.cache` on Linux). A `WAVETANK_CACHE_HOME` override is
//! honored for tests or portable setups. The files are ephemeral working
//! storage; nothing here attempts cleanup.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the cache directory that lives under the OS cache root.
pub const CACHE_DIR_NAME: &str = "wavetank";

static CACHE_BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing the cache directory.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base cache directory could be resolved.
    #[error("No suitable base cache directory available for sample data")]
    NoBaseDir,
    /// Failed to create the cache directory.
    #[error("Failed to create cache directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the `wavetank` cache directory, creating it if needed.
pub fn cache_root_dir() -> Result<PathBuf, AppDirError> {
    let base = cache_base_dir().ok_or(AppDirError::NoBaseDir)?;
    let path = base.join(CACHE_DIR_NAME);
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn cache_base_dir() -> Option<PathBuf> {
    if let Some(path) = CACHE_BASE_OVERRIDE
        .lock()
        .ok()
        .and_then(|guard| guard.clone())
    {
        return Some(path);
    }
    if let Ok(path) = std::env::var("WAVETANK_CACHE_HOME") {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.cache_dir().to_path_buf())
}

#[cfg(test)]
fn set_cache_base_override(path: PathBuf) {
    let mut guard = CACHE_BASE_OVERRIDE
        .lock()
        .expect("cache base override mutex poisoned");
    *guard = Some(path);
}

#[cfg(test)]
fn clear_cache_base_override() {
    let mut guard = CACHE_BASE_OVERRIDE
        .lock()
        .expect("cache base override mutex poisoned");
    *guard = None;
}
