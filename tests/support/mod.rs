pub mod wav;

/// Slow sine sweep used across the integration tests; one value per frame.
pub fn sine(count: usize) -> Vec<f32> {
    (0..count)
        .map(|i| (i as f32 * std::f32::consts::PI / 180.0).sin())
        .collect()
}
