//! Audio loaders that stream decoded frames into sample channels.
//!
//! A loader owns the decode loop: it obtains one empty channel per source
//! channel from the builder, appends bounded buffers of frames so memory
//! stays flat and progress stays live, and hands the finished channels back.
//! Undecodable input is reported as "did not complete" (`None`), not as a
//! typed error; resource failures from the store do propagate.

use std::{path::Path, path::PathBuf, thread};

use hound::SampleFormat;

use crate::sample::{LoadOperation, Sample};
use crate::store::{SampleChannel, StoreError};

/// Frames appended per channel in one step; bounds peak memory during
/// ingestion and sets the granularity of progress updates.
pub const LOADER_BUFFER_FRAMES: usize = 1 << 20;

/// Everything a completed load hands back to the sample.
pub struct LoadResult {
    /// Bits per sample of the source file.
    pub bit_depth: u32,
    /// Sample rate of the source file in Hz.
    pub sample_rate: f64,
    /// One store per source channel, in source order.
    pub channels: Vec<SampleChannel>,
}

/// Decodes one audio file into per-channel sample stores.
pub trait AudioLoader {
    /// Decode `path`, streaming frames into channels obtained from
    /// `build_channel` and posting fractional progress on `operation`.
    ///
    /// Returns `Ok(None)` when the source cannot be decoded; storage errors
    /// propagate as `Err`.
    fn import_sample(
        &self,
        path: &Path,
        operation: &LoadOperation,
        build_channel: &dyn Fn() -> SampleChannel,
    ) -> Result<Option<LoadResult>, StoreError>;
}

/// WAV loader built on `hound`.
pub struct WavLoader;

impl AudioLoader for WavLoader {
    fn import_sample(
        &self,
        path: &Path,
        operation: &LoadOperation,
        build_channel: &dyn Fn() -> SampleChannel,
    ) -> Result<Option<LoadResult>, StoreError> {
        operation.set_progress(0.0);
        tracing::info!("Loading {}", path.display());

        let mut reader = match hound::WavReader::open(path) {
            Ok(reader) => reader,
            Err(error) => {
                tracing::error!("Unable to open {} for reading: {error}", path.display());
                return Ok(None);
            }
        };
        let spec = reader.spec();
        let channel_count = spec.channels.max(1) as usize;
        let total_frames = reader.duration() as u64;
        tracing::debug!(
            "Format: {} channels, {} Hz, {} bit, {total_frames} frames",
            spec.channels,
            spec.sample_rate,
            spec.bits_per_sample
        );

        let mut channels: Vec<SampleChannel> = Vec::with_capacity(channel_count);
        for number in 0..channel_count {
            let mut channel = build_channel();
            channel.set_name(channel_name(channel_count, number));
            channels.push(channel);
        }

        let completed = match spec.sample_format {
            SampleFormat::Float => ingest(
                reader.samples::<f32>(),
                &mut channels,
                total_frames,
                operation,
            )?,
            SampleFormat::Int => {
                let scale = (1i64 << spec.bits_per_sample.saturating_sub(1)).max(1) as f32;
                ingest(
                    reader.samples::<i32>().map(move |s| s.map(|v| v as f32 / scale)),
                    &mut channels,
                    total_frames,
                    operation,
                )?
            }
        };
        if !completed {
            return Ok(None);
        }

        operation.set_progress(1.0);
        tracing::info!("Loaded {total_frames} frames from {}", path.display());
        Ok(Some(LoadResult {
            bit_depth: spec.bits_per_sample as u32,
            sample_rate: spec.sample_rate as f64,
            channels,
        }))
    }
}

/// De-interleave `samples` into the channels, appending a bounded buffer at
/// a time. Returns `Ok(false)` when decoding failed mid-stream.
fn ingest<I>(
    samples: I,
    channels: &mut [SampleChannel],
    total_frames: u64,
    operation: &LoadOperation,
) -> Result<bool, StoreError>
where
    I: Iterator<Item = Result<f32, hound::Error>>,
{
    let channel_count = channels.len();
    let mut pending: Vec<Vec<f32>> = vec![Vec::new(); channel_count];
    let mut slot = 0usize;
    let mut frames_done = 0u64;

    for sample in samples {
        let value = match sample {
            Ok(value) => value,
            Err(error) => {
                tracing::error!("Sample decode failed: {error}");
                return Ok(false);
            }
        };
        pending[slot].push(value);
        slot += 1;
        if slot == channel_count {
            slot = 0;
            frames_done += 1;
            if pending[0].len() >= LOADER_BUFFER_FRAMES {
                flush(channels, &mut pending)?;
                if total_frames > 0 {
                    operation.set_progress(frames_done as f32 / total_frames as f32);
                }
            }
        }
    }
    flush(channels, &mut pending)?;
    Ok(true)
}

fn flush(channels: &mut [SampleChannel], pending: &mut [Vec<f32>]) -> Result<(), StoreError> {
    for (channel, buffer) in channels.iter_mut().zip(pending.iter_mut()) {
        if !buffer.is_empty() {
            channel.append_data(buffer)?;
            buffer.clear();
        }
    }
    Ok(())
}

fn channel_name(channel_count: usize, number: usize) -> String {
    match (channel_count, number) {
        (1, _) => "Mono".to_string(),
        (2, 0) => "Left".to_string(),
        (2, _) => "Right".to_string(),
        _ => format!("Channel {number}"),
    }
}

/// Handle to a sample load running on a named worker thread.
///
/// The caller keeps the progress sink while the thread owns the sample;
/// joining hands the sample back together with the load result.
pub struct LoadTask {
    operation: std::sync::Arc<LoadOperation>,
    handle: thread::JoinHandle<(Sample, Result<(), StoreError>)>,
}

impl LoadTask {
    /// Run [`Sample::load_sample_with`] on a background thread.
    pub fn spawn<L>(mut sample: Sample, path: PathBuf, loader: L) -> Self
    where
        L: AudioLoader + Send + 'static,
    {
        let operation = std::sync::Arc::new(LoadOperation::new("Loading Sample"));
        let thread_operation = std::sync::Arc::clone(&operation);
        let handle = thread::Builder::new()
            .name("sample-load".to_string())
            .spawn(move || {
                let result = sample.load_sample_with(&path, &loader, thread_operation);
                (sample, result)
            })
            .expect("spawn sample-load thread");

        Self { operation, handle }
    }

    /// Fractional progress of the running load.
    pub fn progress(&self) -> f32 {
        self.operation.progress()
    }

    /// The shared progress sink.
    pub fn operation(&self) -> &std::sync::Arc<LoadOperation> {
        &self.operation
    }

    /// Whether the worker thread has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the load and hand the sample back.
    pub fn join(self) -> (Sample, Result<(), StoreError>) {
        self.handle.join().expect("sample-load thread panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use tempfile::tempdir;

    fn write_stereo_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample((i % 100) as i16).unwrap();
            writer.write_sample(-((i % 100) as i16)).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn wav_loader_splits_interleaved_channels() {
        let dir = tempdir().unwrap();
        let wav_path = dir.path().join("stereo.wav");
        write_stereo_wav(&wav_path, 1000);

        let mut sample = Sample::new(StoreConfig::at(dir.path().join("cache")));
        sample.load_sample(&wav_path, &WavLoader).unwrap();

        assert!(sample.is_loaded());
        assert_eq!(sample.channels().len(), 2);
        assert_eq!(sample.number_of_frames(), 1000);
        assert_eq!(sample.bit_depth(), 16);
        assert_eq!(sample.sample_rate(), 48_000.0);
        assert_eq!(sample.channels()[0].name(), "Left");
        assert_eq!(sample.channels()[1].name(), "Right");

        let left = sample.channels()[0].first_block().unwrap();
        let right = sample.channels()[1].first_block().unwrap();
        for i in 0..1000u64 {
            let expected = (i % 100) as f32 / 32_768.0;
            assert_eq!(left.data_at(i), expected);
            assert_eq!(right.data_at(i), -expected);
        }
    }

    #[test]
    fn wav_loader_reads_float_mono() {
        let dir = tempdir().unwrap();
        let wav_path = dir.path().join("mono.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&wav_path, spec).unwrap();
        let data: Vec<f32> = (0..44_100)
            .map(|i| (i as f32 * std::f32::consts::PI / 180.0).sin())
            .collect();
        for &value in &data {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let mut sample = Sample::new(StoreConfig::at(dir.path().join("cache")));
        sample.load_sample(&wav_path, &WavLoader).unwrap();

        assert_eq!(sample.channels().len(), 1);
        assert_eq!(sample.channels()[0].name(), "Mono");
        assert_eq!(sample.number_of_frames(), 44_100);
        let block = sample.channels()[0].first_block().unwrap();
        for (i, &expected) in data.iter().enumerate() {
            assert_eq!(block.data_at(i as u64), expected);
        }
    }

    #[test]
    fn missing_file_reports_not_completed() {
        let dir = tempdir().unwrap();
        let mut sample = Sample::new(StoreConfig::at(dir.path()));
        sample
            .load_sample(&dir.path().join("missing.wav"), &WavLoader)
            .unwrap();

        assert!(!sample.is_loaded());
        assert!(sample.current_operation().is_some());
    }

    #[test]
    fn background_load_hands_the_sample_back() {
        let dir = tempdir().unwrap();
        let wav_path = dir.path().join("stereo.wav");
        write_stereo_wav(&wav_path, 500);

        let sample = Sample::new(StoreConfig::at(dir.path().join("cache")));
        let task = LoadTask::spawn(sample, wav_path, WavLoader);
        let (sample, result) = task.join();

        result.unwrap();
        assert!(sample.is_loaded());
        assert_eq!(sample.number_of_frames(), 500);
        assert!(sample.current_operation().is_none());
    }
}
