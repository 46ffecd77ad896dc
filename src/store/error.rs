//! Umbrella error for store operations.

use thiserror::Error;

use crate::app_dirs::AppDirError;
use crate::store::cache_file::CacheFileError;
use crate::store::mapped_region::MappedRegionError;

/// Any failure that can surface from ingesting data into a channel.
///
/// Resource-allocation failures are fatal to the ingestion attempt that hit
/// them; callers may retry the whole load. Out-of-range reads are not errors
/// at all and degrade to sentinel values at the read site.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Creating or growing a backing cache file failed.
    #[error(transparent)]
    CacheFile(#[from] CacheFileError),
    /// Mapping a persisted region failed.
    #[error(transparent)]
    MappedRegion(#[from] MappedRegionError),
    /// The cache directory could not be resolved or created.
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    /// The channel's tail link was missing while the channel was not empty.
    /// Indicates a bug in the append logic rather than a runtime condition.
    #[error("Channel tail block missing while the channel is not empty")]
    InvalidLastBlock,
}
