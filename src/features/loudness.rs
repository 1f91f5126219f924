//! Bark-band loudness over fixed-size PCM frames.
//!
//! Each frame is Hann-windowed and transformed; the magnitude spectrum is split
//! into 24 bands of equal width on the Bark scale, each band's magnitude sum is
//! compressed with a 0.23 power (specific loudness) and the band values are
//! summed into the frame's total loudness.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Samples per analysis frame. Frames do not overlap.
pub const FRAME_SIZE: usize = 2048;

/// Number of critical bands the spectrum is split into.
pub const BARK_BANDS: usize = 24;

const SPECIFIC_LOUDNESS_EXPONENT: f32 = 0.23;

/// Hann window coefficient, zero at both edges.
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 - 0.5 * ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos()
}

/// Critical-band rate (Bark) of a frequency in Hz.
pub fn hz_to_bark(frequency: f32) -> f32 {
    13.0 * (frequency / 1315.8).atan() + 3.5 * (frequency / 7518.0).powi(2).atan()
}

/// Per-sample-rate analysis state: FFT plan, window and band boundaries.
pub struct LoudnessAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Spectrum bin index where each band starts; the last entry closes the final band.
    band_limits: [usize; BARK_BANDS + 1],
    scratch: Vec<Complex<f32>>,
}

impl LoudnessAnalyzer {
    pub fn new(sample_rate: u32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FRAME_SIZE);
        let window = (0..FRAME_SIZE).map(|i| hann_window(i, FRAME_SIZE)).collect();

        Self {
            fft,
            window,
            band_limits: bark_band_limits(sample_rate),
            scratch: vec![Complex::new(0.0, 0.0); FRAME_SIZE],
        }
    }

    /// Total loudness of one frame of exactly `FRAME_SIZE` samples.
    pub fn frame_loudness(&mut self, frame: &[f32]) -> f32 {
        debug_assert_eq!(frame.len(), FRAME_SIZE);

        for ((slot, sample), w) in self.scratch.iter_mut().zip(frame).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let spectrum = &self.scratch[..FRAME_SIZE / 2];
        let mut total = 0.0;
        for band in self.band_limits.windows(2) {
            let energy: f32 = spectrum[band[0]..band[1]].iter().map(|c| c.norm()).sum();
            total += energy.powf(SPECIFIC_LOUDNESS_EXPONENT);
        }
        total
    }
}

fn bark_band_limits(sample_rate: u32) -> [usize; BARK_BANDS + 1] {
    let spectrum_len = FRAME_SIZE / 2;
    let bark: Vec<f32> = (0..spectrum_len)
        .map(|i| hz_to_bark(i as f32 * sample_rate as f32 / FRAME_SIZE as f32))
        .collect();
    let max_bark = bark[spectrum_len - 1];

    let mut limits = [spectrum_len - 1; BARK_BANDS + 1];
    limits[0] = 0;

    let mut band = 1;
    let mut band_end = max_bark / BARK_BANDS as f32;
    for (i, value) in bark.iter().enumerate() {
        while band < BARK_BANDS && *value > band_end {
            limits[band] = i;
            band += 1;
            band_end = band as f32 * max_bark / BARK_BANDS as f32;
        }
    }

    limits
}

/// Mean frame loudness of a mono signal.
///
/// The signal is cut into `len / FRAME_SIZE` frames; a trailing partial frame
/// is ignored. Frames whose loudness is zero or not finite do not contribute.
/// Returns `None` when no frame contributes, which callers must keep distinct
/// from a computed loudness of zero.
pub fn extract_loudness(samples: &[f32], sample_rate: u32) -> Option<f32> {
    if sample_rate == 0 || samples.len() < FRAME_SIZE {
        return None;
    }

    let mut analyzer = LoudnessAnalyzer::new(sample_rate);
    let mut sum = 0.0f64;
    let mut count = 0usize;

    for frame in samples.chunks_exact(FRAME_SIZE) {
        let value = analyzer.frame_loudness(frame);
        if value.is_finite() && value != 0.0 {
            sum += value as f64;
            count += 1;
        }
    }

    if count == 0 {
        None
    } else {
        Some((sum / count as f64) as f32)
    }
}
