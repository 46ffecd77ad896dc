//! Append-only, page-aligned backing files for mapped sample data.
//!
//! One cache file holds concatenated binary records (raw `f32` frames or
//! cache points) with no header or index; the in-process block list is the
//! only index. Every allocation is padded with zero bytes to the next page
//! boundary so region starts satisfy the OS mapping alignment requirement.
//! Files are never truncated and outlive the process only as orphaned temp
//! files.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;
use uuid::Uuid;

/// Prefix used for every cache file name.
pub const CACHE_FILE_PREFIX: &str = "wavetank";

/// Errors raised while creating or growing a cache file.
#[derive(Debug, Error)]
pub enum CacheFileError {
    /// The uniquely named file could not be created exclusively.
    #[error("Failed to create cache file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Appending data or padding to the file failed.
    #[error("Failed to append to cache file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Byte span of one allocation. `offset` is always page aligned; `byte_len`
/// excludes the zero padding that follows the data.
#[derive(Clone, Copy, Debug)]
pub struct Span {
    pub offset: u64,
    pub byte_len: usize,
}

/// An exclusively created, append-only file under the cache directory.
///
/// Writes must stay serialized per file; the single-writer ingestion path
/// guarantees that. Already-written spans are immutable and safe to map and
/// read from other threads.
pub struct CacheFile {
    path: PathBuf,
    file: Arc<File>,
    write_offset: u64,
}

impl CacheFile {
    /// Create an exclusive cache file with a globally unique name in `dir`.
    pub fn create(dir: &Path, extension: &str) -> Result<Self, CacheFileError> {
        let name = format!("{CACHE_FILE_PREFIX}-{}.{extension}", Uuid::new_v4());
        let path = dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| CacheFileError::Create {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("Created cache file {}", path.display());

        Ok(Self {
            path,
            file: Arc::new(file),
            write_offset: 0,
        })
    }

    /// Append `bytes` at the write cursor, then zero-pad to the next page
    /// boundary so the following allocation starts page aligned. Returns the
    /// span of the data itself, excluding padding.
    pub fn allocate(&mut self, bytes: &[u8]) -> Result<Span, CacheFileError> {
        let offset = self.write_offset;
        let mut file = &*self.file;
        file.write_all(bytes).map_err(|source| CacheFileError::Write {
            path: self.path.clone(),
            source,
        })?;

        let mut end = offset + bytes.len() as u64;
        let page = page_size() as u64;
        let remainder = end % page;
        if remainder != 0 {
            let padding = (page - remainder) as usize;
            tracing::debug!(
                "Padding {} by {padding} bytes to the next page boundary",
                self.path.display()
            );
            file.write_all(&vec![0u8; padding])
                .map_err(|source| CacheFileError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            end += padding as u64;
        }
        self.write_offset = end;

        Ok(Span {
            offset,
            byte_len: bytes.len(),
        })
    }

    /// Shared handle to the underlying file, used by mapped regions.
    pub(crate) fn handle(&self) -> Arc<File> {
        Arc::clone(&self.file)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Alignment required for mapping offsets.
pub(crate) fn page_size() -> usize {
    #[cfg(not(target_os = "windows"))]
    {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        usize::try_from(size).unwrap_or(4096)
    }
    #[cfg(target_os = "windows")]
    {
        // Mapping offsets must match the allocation granularity, which is
        // 64 KiB on every supported Windows version.
        64 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn allocations_start_page_aligned() {
        let dir = tempdir().unwrap();
        let mut cache = CacheFile::create(dir.path(), "data").unwrap();

        let first = cache.allocate(&[1u8; 100]).unwrap();
        let second = cache.allocate(&[2u8; 5000]).unwrap();
        let third = cache.allocate(&[3u8; 1]).unwrap();

        let page = page_size() as u64;
        for span in [first, second, third] {
            assert_eq!(span.offset % page, 0);
        }
        assert_eq!(first.byte_len, 100);
        assert_eq!(second.byte_len, 5000);
        assert!(second.offset >= first.offset + first.byte_len as u64);
        assert!(third.offset >= second.offset + second.byte_len as u64);
    }

    #[test]
    fn file_length_includes_padding() {
        let dir = tempdir().unwrap();
        let mut cache = CacheFile::create(dir.path(), "data").unwrap();
        cache.allocate(&[7u8; 10]).unwrap();

        let len = std::fs::metadata(cache.path()).unwrap().len();
        assert_eq!(len % page_size() as u64, 0);
        assert!(len >= 10);
    }

    #[test]
    fn names_are_unique_per_file() {
        let dir = tempdir().unwrap();
        let first = CacheFile::create(dir.path(), "data").unwrap();
        let second = CacheFile::create(dir.path(), "data").unwrap();
        assert_ne!(first.path(), second.path());

        let name = first.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(CACHE_FILE_PREFIX));
        assert!(name.ends_with(".data"));
    }
}
