//! Factories that realize raw sample buffers into persisted blocks.

use std::{fs, sync::Mutex};

use crate::store::block::{FileBlockStorage, MemoryBlockStorage, SampleBlock};
use crate::store::cache_file::{CacheFile, CacheFileError};
use crate::store::cache_point::{self, CachePoint};
use crate::store::config::StoreConfig;
use crate::store::error::StoreError;
use crate::store::mapped_region::MappedRegion;

/// Turns a raw buffer into a block the channel can append.
pub trait SampleBlockFactory: Send + Sync {
    /// Persist `data`, compute its cache points, and build a block over both.
    fn create_block(&self, data: &[f32]) -> Result<SampleBlock, StoreError>;
}

struct ChannelFiles {
    data: CacheFile,
    cache_points: CacheFile,
}

/// File-backed factory owning the channel's two cache files: one for raw
/// frame data, one for cache points.
///
/// The files are created lazily when the first block is persisted. The mutex
/// serializes writes per file; ingestion is single-writer, so it is never
/// contended.
pub struct FileBlockFactory {
    config: StoreConfig,
    files: Mutex<Option<ChannelFiles>>,
}

impl FileBlockFactory {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            files: Mutex::new(None),
        }
    }

    fn open_files(&self) -> Result<ChannelFiles, StoreError> {
        let dir = self.config.cache_dir();
        fs::create_dir_all(dir).map_err(|source| CacheFileError::Create {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(ChannelFiles {
            data: CacheFile::create(dir, "data")?,
            cache_points: CacheFile::create(dir, "cache")?,
        })
    }
}

impl SampleBlockFactory for FileBlockFactory {
    fn create_block(&self, data: &[f32]) -> Result<SampleBlock, StoreError> {
        tracing::debug!("Calculating cache points for {} samples", data.len());
        let cache_points: Vec<CachePoint> = cache_point::summarize(data);

        let mut guard = self.files.lock().expect("cache file mutex poisoned");
        if guard.is_none() {
            *guard = Some(self.open_files()?);
        }
        let files = guard.as_mut().expect("cache files just created");

        let data_span = files.data.allocate(bytemuck::cast_slice(data))?;
        let point_span = files
            .cache_points
            .allocate(bytemuck::cast_slice(&cache_points))?;

        let mut data_region =
            MappedRegion::<f32>::new(files.data.handle(), data_span.offset, data_span.byte_len);
        data_region.map()?;
        let mut point_region = MappedRegion::<CachePoint>::new(
            files.cache_points.handle(),
            point_span.offset,
            point_span.byte_len,
        );
        point_region.map()?;

        let storage = FileBlockStorage::new(
            data_region,
            0,
            data.len(),
            point_region,
            0,
            cache_points.len(),
        );
        Ok(SampleBlock::new(Box::new(storage)))
    }
}

/// In-memory factory used by tests that exercise channel and iterator logic
/// without touching the filesystem.
pub struct MemoryBlockFactory;

impl SampleBlockFactory for MemoryBlockFactory {
    fn create_block(&self, data: &[f32]) -> Result<SampleBlock, StoreError> {
        Ok(SampleBlock::new(Box::new(MemoryBlockStorage::new(
            data.to_vec(),
        ))))
    }
}
