// src/classify/calibrate.rs
//
// Confidence Calibrator: scales a detection's confidence by the submitting
// reporter's trust score. Applied once, at submission.

use log::{debug, warn};

use crate::detection::{sanitize_confidence, Detection};

/// Trust assumed for a reporter with no history
pub const DEFAULT_TRUST: f32 = 1.0;
pub const MAX_TRUST: f32 = 10.0;

/// `min(1, base * (1 + trust / 10))`, trust clamped to [0, 10]
pub fn calibrated_confidence(base: f32, trust: f32) -> f32 {
    let trust = clamp_trust(trust);
    sanitize_confidence((base * (1.0 + trust / 10.0)).min(1.0))
}

fn clamp_trust(trust: f32) -> f32 {
    if trust.is_finite() {
        trust.clamp(0.0, MAX_TRUST)
    } else {
        DEFAULT_TRUST
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Calibrator;

impl Calibrator {
    pub fn new() -> Self {
        Self
    }

    /// Calibrate in place and record the trust used. A detection that was
    /// already calibrated keeps its confidence.
    pub fn apply(&self, detection: &mut Detection, trust: f32) -> f32 {
        if let Some(previous) = detection.calibrated_with_trust {
            if previous != trust {
                warn!(
                    "{} already calibrated with trust {previous}, ignoring trust {trust}",
                    detection.hazard
                );
            }
            return detection.confidence;
        }

        let trust = clamp_trust(trust);
        let before = detection.confidence;
        detection.confidence = calibrated_confidence(before, trust);
        detection.calibrated_with_trust = Some(trust);
        debug!(
            "calibrated {} with trust {trust}: {before:.3} -> {:.3}",
            detection.hazard, detection.confidence
        );
        detection.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HazardKind;
    use crate::detection::{ClassifierTier, Diagnostics};
    use chrono::Utc;

    fn detection(confidence: f32) -> Detection {
        Detection::new(
            HazardKind::GushingWater,
            confidence,
            [0.0; 13],
            0.05,
            Utc::now(),
            Diagnostics {
                class_score: None,
                timbral_distance: 5.0,
                spectral_gate_passed: true,
                tier: ClassifierTier::Degraded,
            },
        )
    }

    #[test]
    fn test_trust_multiplier() {
        assert!((calibrated_confidence(0.5, 0.0) - 0.5).abs() < 1e-6);
        assert!((calibrated_confidence(0.5, 5.0) - 0.75).abs() < 1e-6);
        assert!((calibrated_confidence(0.5, DEFAULT_TRUST) - 0.55).abs() < 1e-6);
        assert_eq!(calibrated_confidence(0.8, 10.0), 1.0);
    }

    #[test]
    fn test_trust_is_clamped() {
        assert!((calibrated_confidence(0.4, -3.0) - 0.4).abs() < 1e-6);
        assert!((calibrated_confidence(0.4, 50.0) - 0.8).abs() < 1e-6);
        assert!((calibrated_confidence(0.4, f32::NAN) - 0.44).abs() < 1e-6);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let calibrator = Calibrator::new();
        let mut d = detection(0.6);

        let first = calibrator.apply(&mut d, 5.0);
        let second = calibrator.apply(&mut d, 5.0);
        let third = calibrator.apply(&mut d, 9.0);

        assert!((first - 0.9).abs() < 1e-6);
        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(d.calibrated_with_trust, Some(5.0));
    }
}
