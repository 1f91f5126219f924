//! Upload-time audio feature extraction.

mod decoder;
mod loudness;

pub use decoder::{decode_audio, DecodeError, DecodedAudio};
pub use loudness::{
    extract_loudness, hann_window, hz_to_bark, LoudnessAnalyzer, BARK_BANDS, FRAME_SIZE,
};

use std::sync::Arc;
use tracing::debug;

/// File bytes shared with the decoder, so the caller keeps its buffer.
#[derive(Clone, Debug)]
pub struct SharedBytes(pub Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// Decodes an uploaded file and computes its mean loudness.
///
/// `Ok(None)` means the audio decoded fine but produced no loudness value
/// (too short, or silent throughout).
pub fn analyze_audio<B>(bytes: B, extension: Option<&str>) -> Result<Option<f32>, DecodeError>
where
    B: AsRef<[u8]> + Send + Sync + 'static,
{
    let decoded = decode_audio(bytes, extension)?;
    let loudness = extract_loudness(&decoded.samples, decoded.sample_rate);
    debug!(
        "Analyzed {:.2}s of audio at {} Hz ({} channel(s)): loudness={:?}",
        decoded.duration_secs(),
        decoded.sample_rate,
        decoded.source_channels,
        loudness
    );
    Ok(loudness)
}
