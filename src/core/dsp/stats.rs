//! Statistical and spectral-shape descriptors

use super::CHROMA_BINS;

/// Guard for divisions by a mean or a total energy
pub const EPSILON: f32 = 1e-10;

/// Compute RMS (Root Mean Square)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population standard deviation
pub fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
    variance.sqrt()
}

/// Convert amplitude to dB (relative to 1.0)
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude > EPSILON {
        20.0 * amplitude.log10()
    } else {
        -200.0
    }
}

/// Zero-crossing rate
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings: usize = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();

    crossings as f32 / (samples.len() - 1) as f32
}

/// Euclidean distance over the common prefix of two vectors
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Centre frequency of magnitude bin `i` for an FFT of `2 * num_bins`
fn bin_frequency(i: usize, num_bins: usize, sample_rate: u32) -> f32 {
    i as f32 * sample_rate as f32 / (2.0 * num_bins as f32)
}

/// Compute spectral centroid (brightness measure)
pub fn spectral_centroid(magnitudes: &[f32], sample_rate: u32) -> f32 {
    let total_energy: f32 = magnitudes.iter().sum();
    if total_energy < EPSILON {
        return 0.0;
    }

    let weighted_sum: f32 = magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| bin_frequency(i, magnitudes.len(), sample_rate) * m)
        .sum();

    weighted_sum / total_energy
}

/// Compute spectral flatness (Wiener entropy)
/// Returns ~1.0 for white noise, approaches 0.0 for tonal signals
pub fn spectral_flatness(magnitudes: &[f32]) -> f32 {
    if magnitudes.is_empty() {
        return 0.0;
    }
    let n = magnitudes.len() as f32;

    let log_sum: f32 = magnitudes.iter().map(|&m| (m + EPSILON).ln()).sum();
    let geometric_mean = (log_sum / n).exp();

    let arithmetic_mean = magnitudes.iter().sum::<f32>() / n;

    if arithmetic_mean < EPSILON {
        return 0.0;
    }

    (geometric_mean / arithmetic_mean).clamp(0.0, 1.0)
}

/// Compute spectral rolloff (frequency below which `percentile` of energy is contained)
pub fn spectral_rolloff(magnitudes: &[f32], sample_rate: u32, percentile: f32) -> f32 {
    let total_energy: f32 = magnitudes.iter().map(|m| m * m).sum();
    if total_energy < EPSILON {
        return 0.0;
    }
    let threshold = total_energy * percentile;

    let mut cumulative = 0.0f32;
    for (i, &mag) in magnitudes.iter().enumerate() {
        cumulative += mag * mag;
        if cumulative >= threshold {
            return bin_frequency(i, magnitudes.len(), sample_rate);
        }
    }

    sample_rate as f32 / 2.0
}

/// Frequency in Hz to critical-band rate in Bark (Zwicker & Terhardt)
pub fn hz_to_bark(freq: f32) -> f32 {
    13.0 * (0.00076 * freq).atan() + 3.5 * (freq / 7500.0).powi(2).atan()
}

/// Perceptual sharpness in acum, Zwicker weighting applied to the
/// magnitude-spectrum distribution over the Bark scale.
pub fn perceptual_sharpness(magnitudes: &[f32], sample_rate: u32) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total < EPSILON {
        return 0.0;
    }

    let weighted: f32 = magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| {
            let z = hz_to_bark(bin_frequency(i, magnitudes.len(), sample_rate));
            let g = if z < 15.8 { 1.0 } else { 0.066 * (0.171 * z).exp() };
            m * g * z
        })
        .sum();

    0.11 * weighted / total
}

/// 12-bin pitch-class profile (C = 0), normalised so the strongest bin is 1
pub fn chroma(magnitudes: &[f32], sample_rate: u32) -> [f32; CHROMA_BINS] {
    let mut bins = [0.0f32; CHROMA_BINS];

    for (i, &m) in magnitudes.iter().enumerate().skip(1) {
        let freq = bin_frequency(i, magnitudes.len(), sample_rate);
        if !(55.0..=5000.0).contains(&freq) {
            continue;
        }
        let semitones_from_a4 = (12.0 * (freq / 440.0).log2()).round() as i32;
        let pitch_class = (semitones_from_a4 + 9).rem_euclid(CHROMA_BINS as i32) as usize;
        bins[pitch_class] += m * m;
    }

    let peak = bins.iter().copied().fold(0.0f32, f32::max);
    if peak > EPSILON {
        for b in &mut bins {
            *b /= peak;
        }
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        let samples = vec![1.0, -1.0, 1.0, -1.0];
        assert!((rms(&samples) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_std_dev_of_constant_is_zero() {
        assert_eq!(std_dev(&[0.3; 8]), 0.0);
        assert!((std_dev(&[1.0, 3.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_spectral_flatness_tonal() {
        let mut mags = vec![0.001; 100];
        mags[50] = 1.0;
        assert!(spectral_flatness(&mags) < 0.1);
    }

    #[test]
    fn test_spectral_flatness_noise() {
        let mags = vec![1.0; 100];
        assert!(spectral_flatness(&mags) > 0.99);
    }

    #[test]
    fn test_zero_crossing_rate_alternating() {
        let samples = vec![1.0, -1.0, 1.0, -1.0, 1.0];
        assert!((zero_crossing_rate(&samples) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
        assert_eq!(euclidean_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_sharpness_rises_with_brightness() {
        let mut dark = vec![0.0; 512];
        let mut bright = vec![0.0; 512];
        dark[10] = 1.0;
        bright[400] = 1.0;
        assert!(perceptual_sharpness(&bright, 44100) > perceptual_sharpness(&dark, 44100));
    }

    #[test]
    fn test_chroma_a440_maps_to_pitch_class_a() {
        // 1024 bins at 44.1 kHz: bin width ~21.5 Hz, bin 20 ~ 430.7 Hz -> A
        let mut mags = vec![0.0; 1024];
        mags[20] = 1.0;
        let profile = chroma(&mags, 44100);
        assert_eq!(profile[9], 1.0);
        assert_eq!(profile.iter().filter(|&&v| v > 0.0).count(), 1);
    }

    #[test]
    fn test_silent_spectrum_descriptors_are_zero() {
        let mags = vec![0.0; 256];
        assert_eq!(spectral_centroid(&mags, 16000), 0.0);
        assert_eq!(spectral_rolloff(&mags, 16000, 0.85), 0.0);
        assert_eq!(perceptual_sharpness(&mags, 16000), 0.0);
    }
}
