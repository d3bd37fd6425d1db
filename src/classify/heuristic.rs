// src/classify/heuristic.rs
//
// Last-resort classifier used when fusion rejects a sample: plain range
// matching on flatness/sharpness, nearest timbre among the profiles that match.

use std::sync::Arc;

use log::debug;

use crate::config::{Catalogue, HazardProfile};
use crate::core::dsp::stats::euclidean_distance;
use crate::core::AggregatedSample;
use crate::detection::{ClassifierTier, Detection, Diagnostics};

pub struct HeuristicClassifier {
    catalogue: Arc<Catalogue>,
    base_confidence: f32,
}

impl HeuristicClassifier {
    pub fn new(catalogue: Arc<Catalogue>, base_confidence: f32) -> Self {
        Self {
            catalogue,
            base_confidence,
        }
    }

    pub fn classify(&self, sample: &AggregatedSample) -> Option<Detection> {
        if sample.is_insufficient() {
            return None;
        }

        let (profile, distance) = self
            .catalogue
            .profiles()
            .iter()
            .filter(|p| p.spectral_gate(sample.spectral_flatness, sample.perceptual_sharpness))
            .map(|p| (p, euclidean_distance(&sample.timbral_vector, &p.expected_timbre)))
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let confidence = self.confidence_for(profile, distance);
        debug!("heuristic match {} at distance {distance:.2} -> {confidence:.3}", profile.kind);

        // Detection::new replaces a zero confidence with the conservative default
        Some(Detection::new(
            profile.kind,
            confidence,
            sample.timbral_vector,
            sample.rms_level,
            sample.captured_at,
            Diagnostics {
                class_score: None,
                timbral_distance: distance,
                spectral_gate_passed: true,
                tier: ClassifierTier::Heuristic,
            },
        ))
    }

    fn confidence_for(&self, profile: &HazardProfile, distance: f32) -> f32 {
        let timbral = (1.0 - distance / profile.max_timbral_distance).max(0.0);
        (self.base_confidence * timbral).clamp(0.0, 1.0)
    }
}
