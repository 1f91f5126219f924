//! Audio fixtures generated on the fly with hound.

use std::f32::consts::PI;
use std::io::Cursor;

pub fn sine(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

pub fn silence(len: usize) -> Vec<f32> {
    vec![0.0; len]
}

/// Mono 16-bit PCM WAV file holding the given samples.
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).expect("Failed to create WAV writer");
        for sample in samples {
            writer
                .write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .expect("Failed to write WAV sample");
        }
        writer.finalize().expect("Failed to finalize WAV file");
    }
    cursor.into_inner()
}
