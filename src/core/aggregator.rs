// src/core/aggregator.rs
//
// Feature Aggregator: reduces one collection window of frames to a single
// immutable AggregatedSample.
//
// - Frames under the energy threshold still count for average/peak RMS but
//   not for the active count.
// - Fewer than `min_active_frames` active frames yields a degraded sample
//   flagged InsufficientData at a fixed, non-zero confidence.
// - The timbral vector and spectral scalars come from the loudest frame;
//   averaging smears short transients.
// - Spectral flux is the mean absolute RMS delta between consecutive frames.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::dsp::{stats, SpectralAnalyzer, CHROMA_BINS, TIMBRAL_DIMS};
use super::frames::AudioFrame;
use crate::config::AggregatorConfig;
use crate::detection::sanitize_confidence;

/// Whether a sample carries enough signal to be classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleQuality {
    Complete,
    InsufficientData,
}

/// Summary features of one analysis window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedSample {
    pub quality: SampleQuality,
    /// Trust in the sample itself; never exactly 0
    pub confidence: f32,
    pub rms_level: f32,
    pub max_rms: f32,
    pub active_frames: usize,
    pub total_frames: usize,
    pub signal_consistency: f32,
    pub timbral_vector: [f32; TIMBRAL_DIMS],
    pub spectral_centroid: f32,
    pub spectral_rolloff: f32,
    pub spectral_flux: f32,
    pub spectral_flatness: f32,
    pub perceptual_sharpness: f32,
    pub zero_crossing_rate: f32,
    /// Loudest frame level in dBFS
    pub loudness: f32,
    /// Mean frame energy (mean square)
    pub energy: f32,
    pub chroma: [f32; CHROMA_BINS],
    /// Capture time of the loudest frame
    pub captured_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl AggregatedSample {
    pub fn is_insufficient(&self) -> bool {
        self.quality == SampleQuality::InsufficientData
    }

    pub fn active_ratio(&self) -> f32 {
        if self.total_frames == 0 {
            0.0
        } else {
            self.active_frames as f32 / self.total_frames as f32
        }
    }

    /// Sample with no usable signal at all
    fn empty(confidence: f32, at: DateTime<Utc>) -> Self {
        Self {
            quality: SampleQuality::InsufficientData,
            confidence,
            rms_level: 0.0,
            max_rms: 0.0,
            active_frames: 0,
            total_frames: 0,
            signal_consistency: 0.0,
            timbral_vector: [0.0; TIMBRAL_DIMS],
            spectral_centroid: 0.0,
            spectral_rolloff: 0.0,
            spectral_flux: 0.0,
            spectral_flatness: 0.0,
            perceptual_sharpness: 0.0,
            zero_crossing_rate: 0.0,
            loudness: stats::amplitude_to_db(0.0),
            energy: 0.0,
            chroma: [0.0; CHROMA_BINS],
            captured_at: at,
            window_start: at,
            window_end: at,
        }
    }
}

/// `max(0, 1 - stddev/mean)` with the mean floored at epsilon
pub fn signal_consistency(rms_values: &[f32]) -> f32 {
    let mean = stats::mean(rms_values).max(stats::EPSILON);
    (1.0 - stats::std_dev(rms_values) / mean).max(0.0)
}

/// Mean absolute RMS change between consecutive frames
pub fn rms_flux(rms_values: &[f32]) -> f32 {
    if rms_values.len() < 2 {
        return 0.0;
    }
    let total: f32 = rms_values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (rms_values.len() - 1) as f32
}

/// Stateful aggregator bound to one sample rate and frame size
pub struct FeatureAggregator {
    config: AggregatorConfig,
    analyzer: SpectralAnalyzer,
}

impl FeatureAggregator {
    pub fn new(config: AggregatorConfig, sample_rate: u32, frame_size: usize) -> Self {
        Self {
            config,
            analyzer: SpectralAnalyzer::new(sample_rate, frame_size),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.analyzer.sample_rate()
    }

    /// Aggregate one window of frames
    pub fn aggregate(&mut self, frames: &[AudioFrame]) -> AggregatedSample {
        let insufficient_confidence = sanitize_confidence(self.config.insufficient_data_confidence);

        let (first, last) = match (frames.first(), frames.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return AggregatedSample::empty(insufficient_confidence, Utc::now()),
        };

        let rms_values: Vec<f32> = frames.iter().map(|f| f.rms).collect();
        let active_frames = rms_values
            .iter()
            .filter(|&&rms| rms >= self.config.min_frame_rms)
            .count();
        let total_frames = frames.len();

        let rms_level = stats::mean(&rms_values);
        let max_rms = rms_values.iter().copied().fold(0.0f32, f32::max);
        let consistency = signal_consistency(&rms_values);
        let energy = stats::mean(&rms_values.iter().map(|r| r * r).collect::<Vec<_>>());

        // Highest-RMS frame is the exemplar; first one wins on ties
        let best = frames
            .iter()
            .reduce(|best, f| if f.rms > best.rms { f } else { best })
            .unwrap_or(first);
        let spectrum = self.analyzer.analyze_frame(&best.samples);

        let (quality, confidence) = if active_frames < self.config.min_active_frames {
            debug!(
                "insufficient data: {active_frames}/{total_frames} frames above {:.4} RMS",
                self.config.min_frame_rms
            );
            (SampleQuality::InsufficientData, insufficient_confidence)
        } else {
            let active_ratio = active_frames as f32 / total_frames as f32;
            (
                SampleQuality::Complete,
                sanitize_confidence(0.5 * active_ratio + 0.5 * consistency),
            )
        };

        AggregatedSample {
            quality,
            confidence,
            rms_level,
            max_rms,
            active_frames,
            total_frames,
            signal_consistency: consistency,
            timbral_vector: spectrum.mfcc,
            spectral_centroid: spectrum.centroid,
            spectral_rolloff: spectrum.rolloff,
            spectral_flux: rms_flux(&rms_values),
            spectral_flatness: spectrum.flatness,
            perceptual_sharpness: spectrum.sharpness,
            zero_crossing_rate: spectrum.zero_crossing_rate,
            loudness: spectrum.loudness_db,
            energy,
            chroma: spectrum.chroma,
            captured_at: best.captured_at,
            window_start: first.captured_at,
            window_end: last.captured_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn frame_at(level: f32, ms: i64) -> AudioFrame {
        // Square wave at the requested RMS
        let samples = (0..512)
            .map(|i| if (i / 8) % 2 == 0 { level } else { -level })
            .collect();
        AudioFrame::new(samples, Utc::now() + Duration::milliseconds(ms))
    }

    fn aggregator() -> FeatureAggregator {
        FeatureAggregator::new(AggregatorConfig::default(), 16000, 512)
    }

    #[test]
    fn test_consistency_of_steady_signal_is_one() {
        assert!((signal_consistency(&[0.2, 0.2, 0.2]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_consistency_never_negative() {
        assert_eq!(signal_consistency(&[0.0, 0.0, 10.0]), 0.0);
        assert_eq!(signal_consistency(&[0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_flux_is_mean_absolute_rms_delta() {
        assert!((rms_flux(&[0.1, 0.3, 0.2]) - 0.15).abs() < 1e-6);
        assert_eq!(rms_flux(&[0.4]), 0.0);
    }

    #[test]
    fn test_quiet_frames_count_for_average_but_not_activity() {
        let frames = vec![frame_at(0.2, 0), frame_at(0.001, 32), frame_at(0.2, 64)];
        let sample = aggregator().aggregate(&frames);

        assert_eq!(sample.quality, SampleQuality::Complete);
        assert_eq!(sample.total_frames, 3);
        assert_eq!(sample.active_frames, 2);
        assert!((sample.rms_level - (0.401 / 3.0)).abs() < 1e-4);
        assert!((sample.max_rms - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_single_active_frame_is_insufficient_but_not_zero() {
        let frames = vec![frame_at(0.3, 0), frame_at(0.0, 32), frame_at(0.0, 64)];
        let sample = aggregator().aggregate(&frames);

        assert!(sample.is_insufficient());
        assert!(sample.confidence > 0.0);
        assert!((sample.confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_empty_window_is_insufficient() {
        let sample = aggregator().aggregate(&[]);
        assert!(sample.is_insufficient());
        assert!(sample.confidence > 0.0);
        assert_eq!(sample.total_frames, 0);
    }

    #[test]
    fn test_timbre_comes_from_loudest_frame() {
        let loud = frame_at(0.5, 64);
        let frames = vec![frame_at(0.05, 0), frame_at(0.1, 32), loud.clone()];

        let mut agg = aggregator();
        let sample = agg.aggregate(&frames);
        let solo = agg.aggregate(&[loud.clone(), loud.clone()]);

        assert_eq!(sample.captured_at, loud.captured_at);
        assert_eq!(sample.timbral_vector, solo.timbral_vector);
    }

    #[test]
    fn test_zero_configured_confidence_is_corrected() {
        let config = AggregatorConfig {
            insufficient_data_confidence: 0.0,
            ..Default::default()
        };
        let mut agg = FeatureAggregator::new(config, 16000, 512);
        let sample = agg.aggregate(&[frame_at(0.0, 0)]);
        assert!(sample.confidence > 0.0);
    }
}
