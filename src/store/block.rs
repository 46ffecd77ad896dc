//! Immutable, contiguous runs of frames with precomputed summaries.
//!
//! A block is created once per ingested buffer and never mutated afterwards,
//! apart from toggling the `reversed` flag and updating chain links when a
//! neighbour is spliced in. Out-of-bounds reads sit on the hot rendering
//! path and therefore degrade to sentinel values with a diagnostic log
//! instead of erroring.

use crate::store::cache_point::{CachePoint, SAMPLES_PER_CACHE_POINT};
use crate::store::mapped_region::MappedRegion;

/// Storage strategy behind a [`SampleBlock`].
///
/// A closed set of two implementations: [`FileBlockStorage`] over mapped
/// cache-file regions for real data, and [`MemoryBlockStorage`] as the
/// in-memory double for tests. Reads past the stored data return zero
/// values after logging.
pub trait BlockStorage: Send + Sync {
    /// Frame value at a storage-local index.
    fn frame(&self, index: u64) -> f32;
    /// Cache point at a storage-local index.
    fn cache_point(&self, index: u64) -> CachePoint;
    /// Number of frames held by this storage.
    fn frame_count(&self) -> u64;
}

/// File-backed storage over one mapped frame region and one mapped
/// cache-point region.
///
/// The offset/length pairs identify the block's slice inside each region in
/// elements. The factory currently maps every block onto its own dedicated
/// region, so offsets are zero today, but sub-block slices stay expressible.
pub struct FileBlockStorage {
    data_region: MappedRegion<f32>,
    data_offset: usize,
    data_len: usize,
    cache_point_region: MappedRegion<CachePoint>,
    cache_point_offset: usize,
    cache_point_len: usize,
}

impl FileBlockStorage {
    pub(crate) fn new(
        data_region: MappedRegion<f32>,
        data_offset: usize,
        data_len: usize,
        cache_point_region: MappedRegion<CachePoint>,
        cache_point_offset: usize,
        cache_point_len: usize,
    ) -> Self {
        Self {
            data_region,
            data_offset,
            data_len,
            cache_point_region,
            cache_point_offset,
            cache_point_len,
        }
    }
}

impl BlockStorage for FileBlockStorage {
    fn frame(&self, index: u64) -> f32 {
        let Some(data) = self.data_region.as_slice() else {
            tracing::error!("Data region is not mapped");
            return 0.0;
        };
        match data.get(self.data_offset + index as usize) {
            Some(&value) => value,
            None => {
                tracing::error!("Frame index {index} outside mapped data region");
                0.0
            }
        }
    }

    fn cache_point(&self, index: u64) -> CachePoint {
        let Some(points) = self.cache_point_region.as_slice() else {
            tracing::error!("Cache point region is not mapped");
            return CachePoint::ZERO;
        };
        if index as usize >= self.cache_point_len {
            tracing::error!(
                "Cache point index {index} outside block length {}",
                self.cache_point_len
            );
            return CachePoint::ZERO;
        }
        match points.get(self.cache_point_offset + index as usize) {
            Some(&point) => point,
            None => {
                tracing::error!("Cache point index {index} outside mapped region");
                CachePoint::ZERO
            }
        }
    }

    fn frame_count(&self) -> u64 {
        self.data_len as u64
    }
}

/// In-memory storage double used by tests; summaries are computed with the
/// same contract summarizer the file path uses.
pub struct MemoryBlockStorage {
    frames: Vec<f32>,
    cache_points: Vec<CachePoint>,
}

impl MemoryBlockStorage {
    pub fn new(frames: Vec<f32>) -> Self {
        let cache_points = crate::store::cache_point::summarize(&frames);
        Self {
            frames,
            cache_points,
        }
    }
}

impl BlockStorage for MemoryBlockStorage {
    fn frame(&self, index: u64) -> f32 {
        match self.frames.get(index as usize) {
            Some(&value) => value,
            None => {
                tracing::error!("Frame index {index} outside in-memory block");
                0.0
            }
        }
    }

    fn cache_point(&self, index: u64) -> CachePoint {
        match self.cache_points.get(index as usize) {
            Some(&point) => point,
            None => {
                tracing::error!("Cache point index {index} outside in-memory block");
                CachePoint::ZERO
            }
        }
    }

    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }
}

/// One contiguous run of frames appended in a single ingestion step.
///
/// Blocks live in a channel-owned arena; `previous`/`next` are arena indices
/// forming a doubly linked sequence, navigation aids rather than ownership.
pub struct SampleBlock {
    storage: Box<dyn BlockStorage>,
    start_frame: u64,
    number_of_frames: u64,
    reversed: bool,
    pub(crate) previous: Option<usize>,
    pub(crate) next: Option<usize>,
}

impl SampleBlock {
    /// Wrap `storage` in a block with no chain links and a zero start frame;
    /// the owning channel assigns both at append time.
    pub fn new(storage: Box<dyn BlockStorage>) -> Self {
        let number_of_frames = storage.frame_count();
        Self {
            storage,
            start_frame: 0,
            number_of_frames,
            reversed: false,
            previous: None,
            next: None,
        }
    }

    /// Absolute offset of this block within the owning channel.
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub(crate) fn set_start_frame(&mut self, start_frame: u64) {
        self.start_frame = start_frame;
    }

    /// Number of frames in this block, fixed at construction.
    pub fn number_of_frames(&self) -> u64 {
        self.number_of_frames
    }

    /// Absolute index of the final frame in this block.
    pub fn last_frame(&self) -> u64 {
        self.start_frame + self.number_of_frames - 1
    }

    /// Whether `frame` (absolute) falls inside this block.
    pub fn contains(&self, frame: u64) -> bool {
        frame >= self.start_frame && frame <= self.last_frame()
    }

    /// Whether reads are index-mirrored without moving stored data.
    pub fn reversed(&self) -> bool {
        self.reversed
    }

    /// Toggle back-to-front reads for this block.
    pub fn set_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
    }

    /// Arena index of the preceding block, if any.
    pub fn previous_block_index(&self) -> Option<usize> {
        self.previous
    }

    /// Arena index of the following block, if any.
    pub fn next_block_index(&self) -> Option<usize> {
        self.next
    }

    /// Frame value at a block-relative position, honoring `reversed`.
    /// Returns zero and logs when `frame` is past the end.
    pub fn data_at(&self, frame: u64) -> f32 {
        if frame >= self.number_of_frames {
            tracing::error!(
                "Out of bounds request: frame {frame} of {}",
                self.number_of_frames
            );
            return 0.0;
        }
        let index = if self.reversed {
            self.reversed_frame(frame)
        } else {
            frame
        };
        self.storage.frame(index)
    }

    /// Cache point covering the block-relative `frame`, honoring `reversed`.
    /// Returns the zero point and logs when `frame` is past the end.
    pub fn cache_point_for_frame(&self, frame: u64) -> CachePoint {
        if frame >= self.number_of_frames {
            tracing::error!(
                "Out of bounds request: cache point for frame {frame} of {}",
                self.number_of_frames
            );
            return CachePoint::ZERO;
        }
        let index = if self.reversed {
            self.reversed_cache_point_index(frame)
        } else {
            frame / SAMPLES_PER_CACHE_POINT as u64
        };
        self.storage.cache_point(index)
    }

    fn reversed_frame(&self, frame: u64) -> u64 {
        (self.number_of_frames - 1) - frame
    }

    // 44100 frames = 173 cache points 0..=172, with 68 extra frames in the
    // short tail point:
    //   frames 0..=67    => point 172
    //   frames 68..=44099 => points 171..=0
    fn reversed_cache_point_index(&self, frame: u64) -> u64 {
        // The final cache point is short when the frame count is not a
        // multiple of the run size; mirrored positions inside that tail must
        // still land on the single tail point.
        let extra_frames = self.number_of_frames % SAMPLES_PER_CACHE_POINT as u64;
        if frame < extra_frames {
            return self.number_of_frames / SAMPLES_PER_CACHE_POINT as u64;
        }
        ((self.number_of_frames - 1) - frame) / SAMPLES_PER_CACHE_POINT as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cache_point::summarize;

    fn sine_block(count: usize) -> SampleBlock {
        let frames: Vec<f32> = (0..count)
            .map(|i| (i as f32 * std::f32::consts::PI / 180.0).sin())
            .collect();
        SampleBlock::new(Box::new(MemoryBlockStorage::new(frames)))
    }

    #[test]
    fn forward_reads_return_stored_frames() {
        let block = sine_block(44_100);
        assert_eq!(block.number_of_frames(), 44_100);
        for i in 0..44_100u64 {
            let expected = (i as f32 * std::f32::consts::PI / 180.0).sin();
            assert_eq!(block.data_at(i), expected);
        }
    }

    #[test]
    fn reversed_reads_mirror_the_block() {
        let mut block = sine_block(44_100);
        block.set_reversed(true);
        for i in 0..44_100u64 {
            let mirrored = (44_100 - 1 - i) as f32;
            let expected = (mirrored * std::f32::consts::PI / 180.0).sin();
            assert_eq!(block.data_at(i), expected);
        }
    }

    #[test]
    fn out_of_bounds_reads_degrade_to_zero() {
        let block = sine_block(44_100);
        for k in [0u64, 1, 44_292] {
            assert_eq!(block.data_at(44_100 + k), 0.0);
            assert_eq!(block.cache_point_for_frame(44_100 + k), CachePoint::ZERO);
        }
    }

    #[test]
    fn cache_points_match_the_summarizer() {
        let frames: Vec<f32> = (0..44_100)
            .map(|i| (i as f32 * std::f32::consts::PI / 180.0).sin())
            .collect();
        let points = summarize(&frames);
        let block = SampleBlock::new(Box::new(MemoryBlockStorage::new(frames)));

        for frame in 0..block.number_of_frames() {
            let index = (frame / SAMPLES_PER_CACHE_POINT as u64) as usize;
            assert_eq!(block.cache_point_for_frame(frame), points[index]);
        }
    }

    #[test]
    fn reversed_cache_points_land_on_the_mirrored_point() {
        let frames: Vec<f32> = (0..44_100)
            .map(|i| (i as f32 * std::f32::consts::PI / 180.0).sin())
            .collect();
        let points = summarize(&frames);
        let mut block = SampleBlock::new(Box::new(MemoryBlockStorage::new(frames)));
        block.set_reversed(true);

        let extra = block.number_of_frames() % SAMPLES_PER_CACHE_POINT as u64;
        for frame in 0..block.number_of_frames() {
            let expected_index = if frame < extra {
                block.number_of_frames() / SAMPLES_PER_CACHE_POINT as u64
            } else {
                ((block.number_of_frames() - 1) - frame) / SAMPLES_PER_CACHE_POINT as u64
            };
            assert_eq!(
                block.cache_point_for_frame(frame),
                points[expected_index as usize]
            );
        }
    }
}
