//! Typed, memory-mapped windows over a backing cache file.
//!
//! A region views one allocation of a [`CacheFile`](super::cache_file::CacheFile)
//! as a slice of `T`. Mapping and unmapping are explicit and must pair; the
//! mapping is released automatically if the region is dropped while still
//! mapped. Each region has at most one active mapping.

use std::{fs::File, marker::PhantomData, mem, sync::Arc};

use bytemuck::Pod;
use memmap2::{MmapMut, MmapOptions};
use thiserror::Error;

/// Errors raised while mapping or unmapping a region.
#[derive(Debug, Error)]
pub enum MappedRegionError {
    /// `map` was called while a mapping was already active.
    #[error("Region is already mapped")]
    AlreadyMapped,
    /// `unmap` was called without an active mapping.
    #[error("Region is not mapped")]
    NotMapped,
    /// The OS mapping call failed.
    #[error("Failed to map {byte_len} bytes at offset {file_offset}: {source}")]
    MappingFailed {
        file_offset: u64,
        byte_len: usize,
        source: std::io::Error,
    },
}

/// A shared read/write mapping of `byte_len` bytes at `file_offset`,
/// viewed as a slice of `T`.
///
/// The tail of the on-disk allocation may include padding bytes, but the
/// region is sized to the data alone, so the typed view never exposes them.
pub struct MappedRegion<T: Pod> {
    file: Arc<File>,
    file_offset: u64,
    byte_len: usize,
    mapping: Option<MmapMut>,
    _marker: PhantomData<T>,
}

impl<T: Pod> MappedRegion<T> {
    /// Region over `byte_len` bytes of `file` starting at the page-aligned
    /// `file_offset`. The mapping is not created until [`map`](Self::map).
    pub(crate) fn new(file: Arc<File>, file_offset: u64, byte_len: usize) -> Self {
        Self {
            file,
            file_offset,
            byte_len,
            mapping: None,
            _marker: PhantomData,
        }
    }

    /// Create the shared read/write mapping.
    pub fn map(&mut self) -> Result<(), MappedRegionError> {
        if self.mapping.is_some() {
            return Err(MappedRegionError::AlreadyMapped);
        }

        let mapping = unsafe {
            MmapOptions::new()
                .offset(self.file_offset)
                .len(self.byte_len)
                .map_mut(&*self.file)
        }
        .map_err(|source| MappedRegionError::MappingFailed {
            file_offset: self.file_offset,
            byte_len: self.byte_len,
            source,
        })?;
        self.mapping = Some(mapping);
        Ok(())
    }

    /// Release the mapping. The OS unmap happens when the mapping is dropped
    /// here, so the only reportable failure is a missing mapping.
    pub fn unmap(&mut self) -> Result<(), MappedRegionError> {
        if self.mapping.take().is_none() {
            return Err(MappedRegionError::NotMapped);
        }
        Ok(())
    }

    /// Whether a mapping is currently active.
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// Typed view of the mapped bytes, `None` while unmapped.
    pub fn as_slice(&self) -> Option<&[T]> {
        self.mapping
            .as_ref()
            .map(|mapping| bytemuck::cast_slice(&mapping[..]))
    }

    /// Number of `T` elements the region covers when mapped.
    pub fn len(&self) -> usize {
        self.byte_len / mem::size_of::<T>()
    }

    /// True when the region covers no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cache_file::CacheFile;
    use tempfile::tempdir;

    fn region_over(values: &[f32]) -> (tempfile::TempDir, MappedRegion<f32>) {
        let dir = tempdir().unwrap();
        let mut cache = CacheFile::create(dir.path(), "data").unwrap();
        let span = cache.allocate(bytemuck::cast_slice(values)).unwrap();
        let region = MappedRegion::new(cache.handle(), span.offset, span.byte_len);
        (dir, region)
    }

    #[test]
    fn mapped_view_reads_back_written_values() {
        let values = [0.25_f32, -1.0, 0.0, 42.5];
        let (_dir, mut region) = region_over(&values);

        region.map().unwrap();
        assert_eq!(region.as_slice().unwrap(), &values);
        assert_eq!(region.len(), values.len());
    }

    #[test]
    fn double_map_is_rejected() {
        let (_dir, mut region) = region_over(&[1.0_f32]);
        region.map().unwrap();
        assert!(matches!(
            region.map(),
            Err(MappedRegionError::AlreadyMapped)
        ));
    }

    #[test]
    fn unmap_requires_a_mapping() {
        let (_dir, mut region) = region_over(&[1.0_f32]);
        assert!(matches!(region.unmap(), Err(MappedRegionError::NotMapped)));

        region.map().unwrap();
        region.unmap().unwrap();
        assert!(region.as_slice().is_none());
        assert!(!region.is_mapped());
    }

    #[test]
    fn second_allocation_maps_independently() {
        let dir = tempdir().unwrap();
        let mut cache = CacheFile::create(dir.path(), "data").unwrap();
        let first = [1.0_f32; 300];
        let second = [-2.0_f32; 7];
        let span_a = cache.allocate(bytemuck::cast_slice(&first)).unwrap();
        let span_b = cache.allocate(bytemuck::cast_slice(&second)).unwrap();

        let mut region_a = MappedRegion::<f32>::new(cache.handle(), span_a.offset, span_a.byte_len);
        let mut region_b = MappedRegion::<f32>::new(cache.handle(), span_b.offset, span_b.byte_len);
        region_a.map().unwrap();
        region_b.map().unwrap();

        assert_eq!(region_a.as_slice().unwrap(), &first);
        assert_eq!(region_b.as_slice().unwrap(), &second);
    }
}
