//! Digital Signal Processing utilities
//!
//! Per-frame descriptors feeding the Feature Aggregator: spectral shape,
//! perceptual sharpness, pitch-class energy and the MFCC timbral vector.

pub mod fft;
pub mod mfcc;
pub mod stats;
pub mod windows;

use fft::FftProcessor;
use mfcc::{MfccExtractor, MfccParams};
use windows::WindowType;

/// Length of the timbral (cepstral) feature vector
pub const TIMBRAL_DIMS: usize = 13;

/// Number of pitch classes in a chroma vector
pub const CHROMA_BINS: usize = 12;

/// Fraction of spectral energy below the rolloff frequency
pub const ROLLOFF_PERCENTILE: f32 = 0.85;

/// Spectral descriptors of a single frame
#[derive(Debug, Clone, Default)]
pub struct FrameSpectrum {
    pub centroid: f32,
    pub rolloff: f32,
    pub flatness: f32,
    pub sharpness: f32,
    pub zero_crossing_rate: f32,
    /// RMS level in dBFS
    pub loudness_db: f32,
    pub chroma: [f32; CHROMA_BINS],
    pub mfcc: [f32; TIMBRAL_DIMS],
}

/// Spectral analyzer for one sample rate and frame size
pub struct SpectralAnalyzer {
    sample_rate: u32,
    shape_fft: FftProcessor,
    cepstral_fft: FftProcessor,
    mfcc: MfccExtractor,
}

impl SpectralAnalyzer {
    /// `frame_size` is rounded up to the next power of two for the FFT
    pub fn new(sample_rate: u32, frame_size: usize) -> Self {
        let fft_size = frame_size.max(64).next_power_of_two();
        Self {
            sample_rate,
            shape_fft: FftProcessor::new(fft_size, WindowType::Hann),
            cepstral_fft: FftProcessor::new(fft_size, WindowType::Hamming),
            mfcc: MfccExtractor::new(&MfccParams::default(), fft_size / 2, sample_rate),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn fft_size(&self) -> usize {
        self.shape_fft.fft_size()
    }

    /// Compute every descriptor for one frame of samples
    pub fn analyze_frame(&mut self, samples: &[f32]) -> FrameSpectrum {
        let mags = self.shape_fft.magnitude_spectrum(samples);
        let cepstral_mags = self.cepstral_fft.magnitude_spectrum(samples);

        FrameSpectrum {
            centroid: stats::spectral_centroid(&mags, self.sample_rate),
            rolloff: stats::spectral_rolloff(&mags, self.sample_rate, ROLLOFF_PERCENTILE),
            flatness: stats::spectral_flatness(&mags),
            sharpness: stats::perceptual_sharpness(&mags, self.sample_rate),
            zero_crossing_rate: stats::zero_crossing_rate(samples),
            loudness_db: stats::amplitude_to_db(stats::rms(samples)),
            chroma: stats::chroma(&mags, self.sample_rate),
            mfcc: self.mfcc.coefficients(&cepstral_mags),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_fft_size_rounds_up() {
        let analyzer = SpectralAnalyzer::new(16000, 1000);
        assert_eq!(analyzer.fft_size(), 1024);
    }

    #[test]
    fn test_tone_is_less_flat_than_noise() {
        let mut analyzer = SpectralAnalyzer::new(16000, 1024);

        let tone: Vec<f32> = (0..1024)
            .map(|i| 0.5 * (2.0 * PI * 1000.0 * i as f32 / 16000.0).sin())
            .collect();
        // Deterministic pseudo-noise (LCG)
        let mut state = 12345u32;
        let noise: Vec<f32> = (0..1024)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                ((state >> 16) as f32 / 32768.0) - 1.0
            })
            .collect();

        let tone_spec = analyzer.analyze_frame(&tone);
        let noise_spec = analyzer.analyze_frame(&noise);

        assert!(tone_spec.flatness < noise_spec.flatness);
        assert!((tone_spec.centroid - 1000.0).abs() < 150.0);
        assert!(noise_spec.sharpness > tone_spec.sharpness);
    }
}
