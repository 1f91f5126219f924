//! Audio decoding using Symphonia.

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported audio format: {0}")]
    Unsupported(String),

    #[error("No audio track found")]
    NoAudioTrack,

    #[error("Unknown sample rate")]
    UnknownSampleRate,

    #[error("Malformed audio stream: {0}")]
    Malformed(String),
}

/// Mono PCM produced by [`decode_audio`].
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source before downmixing.
    pub source_channels: usize,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

fn downmix_into(target: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels <= 1 {
        target.extend_from_slice(interleaved);
        return;
    }
    target.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

/// Decodes an in-memory audio file into mono samples.
///
/// `extension` is an optional container hint (e.g. `"wav"`, `"mp3"`); the
/// content is probed regardless. Individual corrupt packets are skipped, but a
/// stream in which no packet decodes is rejected.
pub fn decode_audio<B>(bytes: B, extension: Option<&str>) -> Result<DecodedAudio, DecodeError>
where
    B: AsRef<[u8]> + Send + Sync + 'static,
{
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;
    let source_channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

    let mut samples = Vec::new();
    let mut decoded_packets = 0usize;
    let mut last_error: Option<String> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                downmix_into(&mut samples, buffer.samples(), channels);
                decoded_packets += 1;
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("Skipping corrupt packet: {}", msg);
                last_error = Some(msg.to_string());
            }
            Err(SymphoniaError::IoError(e)) => {
                debug!("Skipping unreadable packet: {}", e);
                last_error = Some(e.to_string());
            }
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        }
    }

    if decoded_packets == 0 {
        if let Some(err) = last_error {
            return Err(DecodeError::Malformed(err));
        }
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        source_channels,
    })
}
