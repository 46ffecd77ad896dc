//! A single audio channel stored as an ordered sequence of sample blocks.
//!
//! Blocks live in an arena `Vec` owned by the channel; chain links are arena
//! indices, so the doubly linked sequence carries no ownership and no cycle
//! concerns. Because appends assign start frames from a running total, the
//! arena is sorted by start frame by construction and doubles as the binary
//! search index for frame lookup.

use crate::store::block::SampleBlock;
use crate::store::error::StoreError;
use crate::store::factory::SampleBlockFactory;

/// One audio channel: append-only ingestion, O(log n) frame lookup.
///
/// Grown by [`append_data`](Self::append_data) during ingestion and frozen
/// once the channel is handed to readers; no append may happen after that.
pub struct SampleChannel {
    name: String,
    blocks: Vec<SampleBlock>,
    head: Option<usize>,
    tail: Option<usize>,
    number_of_frames: u64,
    factory: Box<dyn SampleBlockFactory>,
}

impl SampleChannel {
    /// Empty channel that will realize appends through `factory`.
    pub fn new(factory: Box<dyn SampleBlockFactory>) -> Self {
        Self {
            name: String::new(),
            blocks: Vec::new(),
            head: None,
            tail: None,
            number_of_frames: 0,
            factory,
        }
    }

    /// Channel name assigned by the loader ("Left", "Right", ...).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Total frames across all blocks.
    pub fn number_of_frames(&self) -> u64 {
        self.number_of_frames
    }

    /// Number of blocks appended so far.
    pub fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    /// Block at an arena index.
    pub fn block(&self, index: usize) -> Option<&SampleBlock> {
        self.blocks.get(index)
    }

    /// Mutable block access, used to toggle reversed playback.
    pub fn block_mut(&mut self, index: usize) -> Option<&mut SampleBlock> {
        self.blocks.get_mut(index)
    }

    /// First block in chain order.
    pub fn first_block(&self) -> Option<&SampleBlock> {
        self.head.and_then(|index| self.blocks.get(index))
    }

    /// Last block in chain order.
    pub fn last_block(&self) -> Option<&SampleBlock> {
        self.tail.and_then(|index| self.blocks.get(index))
    }

    /// Build a block from `data` via the factory and append it.
    pub fn append_data(&mut self, data: &[f32]) -> Result<(), StoreError> {
        tracing::debug!("Appending {} samples", data.len());
        let block = self.factory.create_block(data)?;
        self.append_block(block)
    }

    fn append_block(&mut self, mut block: SampleBlock) -> Result<(), StoreError> {
        let index = self.blocks.len();

        // The very first block starts the chain.
        if self.head.is_none() {
            block.set_start_frame(0);
            self.number_of_frames = block.number_of_frames();
            self.blocks.push(block);
            self.head = Some(index);
            self.tail = Some(index);
            return Ok(());
        }

        let tail = self.tail.ok_or(StoreError::InvalidLastBlock)?;
        block.set_start_frame(self.number_of_frames);
        self.number_of_frames += block.number_of_frames();
        self.blocks.push(block);
        self.splice_after(tail, index);
        self.tail = Some(index);
        Ok(())
    }

    /// Splice `new_index` into the chain immediately after `at`, relinking
    /// any existing successor after the inserted block.
    fn splice_after(&mut self, at: usize, new_index: usize) {
        let old_next = self.blocks[at].next;
        self.blocks[at].next = Some(new_index);
        self.blocks[new_index].previous = Some(at);
        self.blocks[new_index].next = old_next;
        if let Some(old_next) = old_next {
            self.blocks[old_next].previous = Some(new_index);
        }
    }

    /// The block whose frame range contains `frame`, or `None` when `frame`
    /// is past the end of the channel.
    pub fn block_for_frame(&self, frame: u64) -> Option<&SampleBlock> {
        self.block_index_for_frame(frame)
            .map(|index| &self.blocks[index])
    }

    pub(crate) fn block_index_for_frame(&self, frame: u64) -> Option<usize> {
        if frame >= self.number_of_frames {
            tracing::warn!(
                "Requested block for frame {frame}, but only {} available",
                self.number_of_frames
            );
            return None;
        }

        let head = self.head?;
        let tail = self.tail?;

        // Start and end of playback are the common access patterns, and the
        // binary search reaches them last; check both up front.
        if self.blocks[head].contains(frame) {
            return Some(head);
        }
        if self.blocks[tail].contains(frame) {
            return Some(tail);
        }

        let mut left = 0usize;
        let mut right = self.blocks.len() - 1;
        while left <= right {
            let middle = left + (right - left) / 2;
            let block = &self.blocks[middle];
            if block.contains(frame) {
                return Some(middle);
            }
            if block.start_frame() > frame {
                right = middle - 1;
            } else {
                left = middle + 1;
            }
        }

        // Blocks are contiguous from frame 0, so an in-range frame always
        // has a containing block; reaching here is an indexing bug.
        unreachable!(
            "no block contains frame {frame} despite {} stored frames",
            self.number_of_frames
        );
    }
}
