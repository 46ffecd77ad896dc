//! Out-of-core audio sample store backed by memory-mapped cache files.
/// Cache directory resolution.
pub mod app_dirs;
/// Audio loaders that stream decoded frames into channels.
pub mod loader;
/// Tracing subscriber setup.
pub mod logging;
/// Aggregate sample owning all channels of one loaded file.
pub mod sample;
/// Block-structured channel storage and iteration.
pub mod store;
