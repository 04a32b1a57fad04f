use std::io::Cursor;
use std::path::Path;

/// Interleaved 32-bit float WAV, as produced by most DAWs.
pub fn float_wav_bytes(sample_rate: u32, channels: u16, interleaved: &[f32]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("create wav writer");
        for &sample in interleaved {
            writer.write_sample(sample).expect("write wav sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

pub fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, interleaved: &[f32]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    std::fs::write(path, float_wav_bytes(sample_rate, channels, interleaved)).expect("write wav");
}

/// Stereo sine with the right channel at half amplitude.
pub fn stereo_sine(sample_rate: u32, frames: usize, hz: f32) -> Vec<f32> {
    (0..frames)
        .flat_map(|frame| {
            let phase = frame as f32 / sample_rate as f32 * hz * std::f32::consts::TAU;
            let left = phase.sin() * 0.8;
            [left, left * 0.5]
        })
        .collect()
}
