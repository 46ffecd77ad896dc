//! Store configuration injected into samples and channels.
//!
//! Replaces process-wide statics: whoever constructs a sample decides where
//! its cache files live, and tests point the store at a temp directory.

use std::path::{Path, PathBuf};

use crate::app_dirs::{self, AppDirError};

/// Where a sample's backing cache files are created.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    cache_dir: PathBuf,
}

impl StoreConfig {
    /// Config rooted at the default per-user cache directory.
    pub fn from_default_dirs() -> Result<Self, AppDirError> {
        Ok(Self {
            cache_dir: app_dirs::cache_root_dir()?,
        })
    }

    /// Config rooted at an explicit directory (tests, portable setups).
    pub fn at(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Directory under which cache files are created.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}
