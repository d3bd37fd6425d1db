// src/core/frames.rs
//
// Short time-domain frames, the unit the capture loop buffers.

use chrono::{DateTime, Duration, Utc};

use super::dsp::stats;

/// One short sample buffer, its RMS energy and capture time
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub rms: f32,
    pub captured_at: DateTime<Utc>,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, captured_at: DateTime<Utc>) -> Self {
        let rms = stats::rms(&samples);
        Self {
            samples,
            rms,
            captured_at,
        }
    }
}

/// Slice a mono signal into consecutive non-overlapping frames.
///
/// Timestamps advance with the sample clock from `start`; a trailing partial
/// frame is dropped.
pub fn frame_signal(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    start: DateTime<Utc>,
) -> Vec<AudioFrame> {
    if frame_size == 0 || sample_rate == 0 {
        return Vec::new();
    }

    samples
        .chunks_exact(frame_size)
        .enumerate()
        .map(|(i, chunk)| {
            let offset_us = (i * frame_size) as i64 * 1_000_000 / sample_rate as i64;
            AudioFrame::new(chunk.to_vec(), start + Duration::microseconds(offset_us))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_frame_signal_timestamps_follow_sample_clock() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let samples = vec![0.1f32; 16000 + 100];

        let frames = frame_signal(&samples, 16000, 4000, start);

        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].captured_at, start);
        assert_eq!(frames[2].captured_at, start + Duration::milliseconds(500));
        assert!((frames[1].rms - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_zero_frame_size_yields_nothing() {
        assert!(frame_signal(&[0.5; 10], 16000, 0, Utc::now()).is_empty());
    }
}
