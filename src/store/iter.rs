//! Stateful cursor over a channel, serving playback and rendering.
//!
//! The iterator advances lazily across block boundaries and tracks its
//! position at two granularities at once: frames for playback and cache
//! points for zoomed-out rendering. Once the cursor runs off the final block
//! it is exhausted for good; construct a fresh iterator to resume elsewhere.

use crate::store::block::SampleBlock;
use crate::store::cache_point::{CachePoint, SAMPLES_PER_CACHE_POINT};
use crate::store::channel::SampleChannel;

/// Cursor over a [`SampleChannel`].
pub struct ChannelIterator<'a> {
    channel: &'a SampleChannel,
    current: Option<usize>,
    frame_in_block: u64,
    cache_point_in_block: u64,
}

impl<'a> ChannelIterator<'a> {
    /// Cursor positioned at the absolute `frame`, or `None` when `frame` is
    /// past the end of the channel.
    pub fn new(channel: &'a SampleChannel, frame: u64) -> Option<Self> {
        let index = channel.block_index_for_frame(frame)?;
        let block = channel.block(index)?;
        let frame_in_block = frame - block.start_frame();
        Some(Self {
            channel,
            current: Some(index),
            frame_in_block,
            cache_point_in_block: frame_in_block / SAMPLES_PER_CACHE_POINT as u64,
        })
    }

    /// False once the cursor has advanced past the final block.
    pub fn has_more_data(&self) -> bool {
        self.current.is_some()
    }

    fn current_block(&self) -> Option<&'a SampleBlock> {
        self.current.and_then(|index| self.channel.block(index))
    }

    /// Return the current frame and step forward by one, rolling into the
    /// next block at the boundary. `None` once exhausted.
    pub fn frame_and_advance(&mut self) -> Option<f32> {
        let block = self.current_block()?;
        let value = block.data_at(self.frame_in_block);

        self.frame_in_block += 1;
        self.cache_point_in_block = self.frame_in_block / SAMPLES_PER_CACHE_POINT as u64;
        if self.frame_in_block >= block.number_of_frames() {
            self.current = block.next_block_index();
            self.frame_in_block = 0;
            self.cache_point_in_block = 0;
        }
        Some(value)
    }

    /// Return the cache point covering the current position and step forward
    /// by one whole cache point. `None` once exhausted.
    pub fn cache_point_and_advance(&mut self) -> Option<CachePoint> {
        let block = self.current_block()?;
        let value = block.cache_point_for_frame(self.frame_in_block);

        self.cache_point_in_block += 1;
        self.frame_in_block = self.cache_point_in_block * SAMPLES_PER_CACHE_POINT as u64;
        if self.frame_in_block >= block.number_of_frames() {
            self.current = block.next_block_index();
            self.frame_in_block = 0;
            self.cache_point_in_block = 0;
        }
        Some(value)
    }

    /// Current frame without advancing; zero when exhausted.
    pub fn peek_frame(&self) -> f32 {
        self.current_block()
            .map(|block| block.data_at(self.frame_in_block))
            .unwrap_or(0.0)
    }

    /// One frame ahead of the cursor without advancing, crossing into the
    /// next block if needed; zero when no further data exists.
    pub fn peek_next_frame(&self) -> f32 {
        let Some(block) = self.current_block() else {
            return 0.0;
        };
        let next = self.frame_in_block + 1;
        if next < block.number_of_frames() {
            return block.data_at(next);
        }
        block
            .next_block_index()
            .and_then(|index| self.channel.block(index))
            .map(|next_block| next_block.data_at(0))
            .unwrap_or(0.0)
    }

    /// Aggregate enough underlying data for one rendered pixel column at the
    /// given zoom and advance past it.
    ///
    /// Below one cache point per pixel this consumes individual frames; at or
    /// above it consumes whole cache points, combining them by min-of-mins,
    /// max-of-maxes, and the mean of the per-point averages (a deliberate
    /// two-level approximation). Either way, `None` means zero underlying
    /// units were consumed because the cursor was exhausted.
    pub fn pixel_cache_point_and_advance(&mut self, frames_per_pixel: u64) -> Option<CachePoint> {
        self.current?;
        if frames_per_pixel < SAMPLES_PER_CACHE_POINT as u64 {
            self.pixel_from_frames(frames_per_pixel)
        } else {
            self.pixel_from_cache_points(frames_per_pixel / SAMPLES_PER_CACHE_POINT as u64)
        }
    }

    fn pixel_from_frames(&mut self, frames_per_pixel: u64) -> Option<CachePoint> {
        let mut min_value = 0.0_f32;
        let mut max_value = 0.0_f32;
        let mut total_above = 0.0_f32;
        let mut total_below = 0.0_f32;
        let mut above_count = 0u64;
        let mut below_count = 0u64;

        let mut consumed = 0u64;
        while consumed < frames_per_pixel {
            let Some(value) = self.frame_and_advance() else {
                break;
            };
            min_value = min_value.min(value);
            max_value = max_value.max(value);
            if value > 0.0 {
                total_above += value;
                above_count += 1;
            } else if value < 0.0 {
                total_below += value;
                below_count += 1;
            }
            consumed += 1;
        }

        if consumed == 0 {
            return None;
        }
        Some(CachePoint {
            min_value,
            max_value,
            avg_min_value: if below_count == 0 {
                0.0
            } else {
                total_below / below_count as f32
            },
            avg_max_value: if above_count == 0 {
                0.0
            } else {
                total_above / above_count as f32
            },
        })
    }

    fn pixel_from_cache_points(&mut self, points_per_pixel: u64) -> Option<CachePoint> {
        let mut min_value = 0.0_f32;
        let mut max_value = 0.0_f32;
        let mut total_above = 0.0_f32;
        let mut total_below = 0.0_f32;

        let mut consumed = 0u64;
        while consumed < points_per_pixel {
            let Some(point) = self.cache_point_and_advance() else {
                break;
            };
            min_value = min_value.min(point.min_value);
            max_value = max_value.max(point.max_value);
            total_above += point.avg_max_value;
            total_below += point.avg_min_value;
            consumed += 1;
        }

        if consumed == 0 {
            return None;
        }
        Some(CachePoint {
            min_value,
            max_value,
            avg_min_value: total_below / consumed as f32,
            avg_max_value: total_above / consumed as f32,
        })
    }
}
