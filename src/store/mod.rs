//! Block-structured, disk-backed sample storage.
//!
//! Decoded PCM flows in through [`SampleChannel::append_data`], which
//! persists each buffer as an immutable [`SampleBlock`] inside page-aligned,
//! memory-mapped cache files and precomputes its waveform summaries. Readers
//! use [`ChannelIterator`] for sequential frames, cache points, or per-pixel
//! aggregates.

mod block;
mod cache_file;
mod cache_point;
mod channel;
mod config;
mod error;
mod factory;
mod iter;
mod mapped_region;

pub use block::{BlockStorage, FileBlockStorage, MemoryBlockStorage, SampleBlock};
pub use cache_file::{CACHE_FILE_PREFIX, CacheFile, CacheFileError, Span};
pub use cache_point::{CachePoint, SAMPLES_PER_CACHE_POINT, summarize};
pub use channel::SampleChannel;
pub use config::StoreConfig;
pub use error::StoreError;
pub use factory::{FileBlockFactory, MemoryBlockFactory, SampleBlockFactory};
pub use iter::ChannelIterator;
pub use mapped_region::{MappedRegion, MappedRegionError};
