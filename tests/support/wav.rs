use std::path::Path;

pub fn write_test_wav(path: &Path, channels: &[Vec<f32>], sample_rate: u32) {
    assert!(!channels.is_empty());
    let frames = channels[0].len();
    assert!(channels.iter().all(|c| c.len() == frames));

    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav writer");
    for frame in 0..frames {
        for channel in channels {
            writer.write_sample(channel[frame]).expect("write wav sample");
        }
    }
    writer.finalize().expect("finalize wav");
}
