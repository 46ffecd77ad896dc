//! Aggregate sample: all channels of one loaded audio file.
//!
//! A sample starts out "not loaded" and transitions in a single swap when a
//! loader finishes: channels, bit depth, and sample rate are assigned
//! together, so readers never observe partial state. A load that did not
//! complete leaves the in-progress operation marker set.

use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

use crate::loader::AudioLoader;
use crate::store::{FileBlockFactory, SampleChannel, StoreConfig, StoreError};

/// Progress sink shared between a running load and its observers.
///
/// Updates are cheap enough to post at high frequency: progress is an `f32`
/// in `[0, 1]` stored as atomic bits, readable from any thread.
pub struct LoadOperation {
    title: Mutex<Option<String>>,
    progress_bits: AtomicU32,
}

impl LoadOperation {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Mutex::new(Some(title.into())),
            progress_bits: AtomicU32::new(0.0_f32.to_bits()),
        }
    }

    /// Fractional progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress_bits.load(Ordering::Relaxed))
    }

    /// Store clamped fractional progress.
    pub fn set_progress(&self, progress: f32) {
        self.progress_bits
            .store(progress.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    /// Short description of the running operation.
    pub fn title(&self) -> Option<String> {
        self.title.lock().expect("operation title poisoned").clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        *self.title.lock().expect("operation title poisoned") = Some(title.into());
    }
}

/// All channels of one loaded file plus its format metadata.
pub struct Sample {
    config: StoreConfig,
    channels: Vec<SampleChannel>,
    bit_depth: u32,
    sample_rate: f64,
    current_operation: Option<Arc<LoadOperation>>,
}

impl Sample {
    /// Empty, not-yet-loaded sample whose cache files will live under
    /// `config`'s cache directory.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            channels: Vec::new(),
            bit_depth: 0,
            sample_rate: 0.0,
            current_operation: None,
        }
    }

    /// The loaded channels; empty until a load completes.
    pub fn channels(&self) -> &[SampleChannel] {
        &self.channels
    }

    /// Mutable channel access, used to toggle reversed playback.
    pub fn channels_mut(&mut self) -> &mut [SampleChannel] {
        &mut self.channels
    }

    /// Frames per channel; zero while not loaded.
    pub fn number_of_frames(&self) -> u64 {
        self.channels
            .first()
            .map(SampleChannel::number_of_frames)
            .unwrap_or(0)
    }

    /// Bits per sample of the source file.
    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    /// Sample rate of the source file in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Whether a load has completed.
    pub fn is_loaded(&self) -> bool {
        !self.channels.is_empty()
    }

    /// The in-progress (or stalled) load operation, if any.
    pub fn current_operation(&self) -> Option<&Arc<LoadOperation>> {
        self.current_operation.as_ref()
    }

    /// Load `path` through `loader`, blocking until it finishes.
    ///
    /// On success the channels, bit depth, and sample rate are committed
    /// together and the operation marker is cleared. When the loader reports
    /// "did not complete" the marker stays set so callers can tell a stalled
    /// load from an empty one. Resource errors abort the attempt; the whole
    /// call may be retried.
    pub fn load_sample(&mut self, path: &Path, loader: &dyn AudioLoader) -> Result<(), StoreError> {
        let operation = Arc::new(LoadOperation::new("Loading Sample"));
        self.load_sample_with(path, loader, operation)
    }

    /// [`load_sample`](Self::load_sample) with a caller-supplied operation,
    /// letting background tasks hand the progress sink to observers first.
    pub fn load_sample_with(
        &mut self,
        path: &Path,
        loader: &dyn AudioLoader,
        operation: Arc<LoadOperation>,
    ) -> Result<(), StoreError> {
        self.current_operation = Some(Arc::clone(&operation));

        let config = self.config.clone();
        let build_channel =
            move || SampleChannel::new(Box::new(FileBlockFactory::new(config.clone())));

        match loader.import_sample(path, &operation, &build_channel)? {
            Some(result) => {
                self.channels = result.channels;
                self.bit_depth = result.bit_depth;
                self.sample_rate = result.sample_rate;
                self.current_operation = None;
                Ok(())
            }
            None => {
                tracing::warn!("Loader did not complete for {}", path.display());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{AudioLoader, LoadResult};
    use tempfile::tempdir;

    struct FakeLoader;

    impl AudioLoader for FakeLoader {
        fn import_sample(
            &self,
            _path: &Path,
            operation: &LoadOperation,
            build_channel: &dyn Fn() -> SampleChannel,
        ) -> Result<Option<LoadResult>, StoreError> {
            let mut channel = build_channel();
            let data: Vec<f32> = (0..44_100)
                .map(|i| (i as f32 * std::f32::consts::PI / 180.0).sin())
                .collect();
            channel.append_data(&data)?;
            operation.set_progress(1.0);
            Ok(Some(LoadResult {
                bit_depth: 16,
                sample_rate: 44_100.0,
                channels: vec![channel],
            }))
        }
    }

    struct FailingLoader;

    impl AudioLoader for FailingLoader {
        fn import_sample(
            &self,
            _path: &Path,
            _operation: &LoadOperation,
            _build_channel: &dyn Fn() -> SampleChannel,
        ) -> Result<Option<LoadResult>, StoreError> {
            Ok(None)
        }
    }

    #[test]
    fn empty_sample_reports_not_loaded() {
        let dir = tempdir().unwrap();
        let sample = Sample::new(StoreConfig::at(dir.path()));
        assert!(!sample.is_loaded());
        assert_eq!(sample.number_of_frames(), 0);
        assert!(sample.channels().is_empty());
        assert!(sample.current_operation().is_none());
    }

    #[test]
    fn successful_load_commits_everything_together() {
        let dir = tempdir().unwrap();
        let mut sample = Sample::new(StoreConfig::at(dir.path()));
        sample
            .load_sample(Path::new("nothing.wav"), &FakeLoader)
            .unwrap();

        assert!(sample.is_loaded());
        assert_eq!(sample.number_of_frames(), 44_100);
        assert_eq!(sample.channels().len(), 1);
        assert_eq!(sample.bit_depth(), 16);
        assert_eq!(sample.sample_rate(), 44_100.0);
        assert!(sample.current_operation().is_none());
    }

    #[test]
    fn incomplete_load_leaves_the_operation_set() {
        let dir = tempdir().unwrap();
        let mut sample = Sample::new(StoreConfig::at(dir.path()));
        sample
            .load_sample(Path::new("nothing.wav"), &FailingLoader)
            .unwrap();

        assert!(!sample.is_loaded());
        assert!(sample.current_operation().is_some());
    }

    #[test]
    fn operation_progress_round_trips_and_clamps() {
        let operation = LoadOperation::new("Loading Sample");
        assert_eq!(operation.progress(), 0.0);
        operation.set_progress(0.5);
        assert_eq!(operation.progress(), 0.5);
        operation.set_progress(7.0);
        assert_eq!(operation.progress(), 1.0);
        assert_eq!(operation.title().as_deref(), Some("Loading Sample"));
    }
}
