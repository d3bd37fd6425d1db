// src/core/dsp/mfcc.rs
//
// Mel-frequency cepstral coefficients, used as the timbral fingerprint that
// detections are matched against.

use super::TIMBRAL_DIMS;

/// MFCC analysis parameters
#[derive(Debug, Clone)]
pub struct MfccParams {
    pub num_mel_bands: usize,
    pub min_freq: f32,
    /// Upper filterbank edge; `None` means Nyquist
    pub max_freq: Option<f32>,
}

impl Default for MfccParams {
    fn default() -> Self {
        Self {
            num_mel_bands: 26,
            min_freq: 20.0,
            max_freq: None,
        }
    }
}

fn hz_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank plus DCT-II, precomputed for one spectrum size
pub struct MfccExtractor {
    /// Per band: (first bin, weights starting at that bin)
    filters: Vec<(usize, Vec<f32>)>,
    dct: Vec<[f32; TIMBRAL_DIMS]>,
    fft_size: usize,
}

impl MfccExtractor {
    /// `num_bins` is the magnitude-spectrum length (`fft_size / 2`)
    pub fn new(params: &MfccParams, num_bins: usize, sample_rate: u32) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let max_freq = params.max_freq.unwrap_or(nyquist).min(nyquist);
        let bands = params.num_mel_bands.max(TIMBRAL_DIMS);
        let bin_hz = nyquist / num_bins as f32;

        let mel_lo = hz_to_mel(params.min_freq);
        let mel_hi = hz_to_mel(max_freq);
        let edges: Vec<f32> = (0..bands + 2)
            .map(|i| mel_to_hz(mel_lo + (mel_hi - mel_lo) * i as f32 / (bands + 1) as f32))
            .collect();

        let filters = edges
            .windows(3)
            .map(|e| {
                let (lo, centre, hi) = (e[0], e[1], e[2]);
                let first = (lo / bin_hz).floor() as usize;
                let last = ((hi / bin_hz).ceil() as usize).min(num_bins.saturating_sub(1));
                let weights = (first..=last)
                    .map(|bin| {
                        let f = bin as f32 * bin_hz;
                        if f <= lo || f >= hi {
                            0.0
                        } else if f <= centre {
                            (f - lo) / (centre - lo)
                        } else {
                            (hi - f) / (hi - centre)
                        }
                    })
                    .collect();
                (first, weights)
            })
            .collect();

        // Orthonormal DCT-II basis, first TIMBRAL_DIMS rows
        let n = bands as f32;
        let dct = (0..bands)
            .map(|m| {
                let mut row = [0.0f32; TIMBRAL_DIMS];
                for (k, value) in row.iter_mut().enumerate() {
                    let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                    *value = scale
                        * (std::f32::consts::PI * k as f32 * (m as f32 + 0.5) / n).cos();
                }
                row
            })
            .collect();

        Self {
            filters,
            dct,
            fft_size: num_bins * 2,
        }
    }

    /// Coefficients for one magnitude spectrum
    pub fn coefficients(&self, magnitudes: &[f32]) -> [f32; TIMBRAL_DIMS] {
        let mut coeffs = [0.0f32; TIMBRAL_DIMS];

        for ((first, weights), basis) in self.filters.iter().zip(&self.dct) {
            let energy: f32 = weights
                .iter()
                .enumerate()
                .filter_map(|(j, w)| magnitudes.get(first + j).map(|m| w * m * m))
                .sum::<f32>()
                / self.fft_size as f32;
            let log_energy = energy.max(1e-10).ln();

            for (c, b) in coeffs.iter_mut().zip(basis) {
                *c += log_energy * b;
            }
        }

        coeffs
    }
}
