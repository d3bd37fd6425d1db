// src/classify/fusion.rs
//
// Fusion Classifier: turns one AggregatedSample (plus optional external
// class scores) into a hazard label and a fused confidence.
//
// Gate order:
// 1. Class-score gate picks the candidate (argmax of weighted class sums).
//    Without external scores the candidate is the timbrally nearest profile.
// 2. Timbral gate. The two rejections are alternates: a low class-score sum
//    when external scores exist, otherwise a timbral distance above the
//    profile's reference distance.
// 3. Spectral gate: flatness and sharpness inside the profile ranges.
// 4. Weighted fusion of the three components plus RMS/activity bonuses.
// 5. Confidence floor; below it the caller falls back to the heuristic tier.

use std::sync::Arc;

use log::debug;

use super::external::ClassScores;
use crate::config::{Catalogue, FusionConfig, FusionWeights, HazardProfile};
use crate::core::dsp::stats::euclidean_distance;
use crate::core::AggregatedSample;
use crate::detection::{ClassifierTier, Detection, Diagnostics};

/// Normalised component values and the weights they were fused with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionBreakdown {
    pub weights: FusionWeights,
    pub class_component: f32,
    pub timbral_component: f32,
    pub spectral_component: f32,
    pub bonus: f32,
    /// Clamped to [0, 1]
    pub confidence: f32,
}

pub struct FusionClassifier {
    catalogue: Arc<Catalogue>,
    config: FusionConfig,
}

impl FusionClassifier {
    pub fn new(catalogue: Arc<Catalogue>, config: FusionConfig) -> Self {
        Self { catalogue, config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Classify one sample; `None` means "no confident hazard"
    pub fn classify(&self, sample: &AggregatedSample, scores: Option<&ClassScores>) -> Option<Detection> {
        if sample.is_insufficient() {
            debug!("fusion skipped: sample flagged insufficient-data");
            return None;
        }
        let scores = scores.filter(|s| !s.is_empty());

        let (profile, class_score) = match scores {
            Some(scores) => {
                let (profile, sum) = self.best_by_class_score(scores)?;
                (profile, Some(sum))
            }
            None => (self.nearest_by_timbre(sample)?, None),
        };
        let distance = euclidean_distance(&sample.timbral_vector, &profile.expected_timbre);

        match class_score {
            Some(sum) if sum < self.config.min_class_score => {
                debug!(
                    "{} rejected: class score {sum:.3} < {:.3}",
                    profile.kind, self.config.min_class_score
                );
                return None;
            }
            None if distance > profile.max_timbral_distance => {
                debug!(
                    "{} rejected: timbral distance {distance:.2} > {:.2}",
                    profile.kind, profile.max_timbral_distance
                );
                return None;
            }
            _ => {}
        }

        let gate_passed =
            profile.spectral_gate(sample.spectral_flatness, sample.perceptual_sharpness);
        let breakdown = self.fuse(profile, sample, class_score, distance, gate_passed);

        debug!(
            "{}: class={:.3} timbral={:.3} spectral={:.0} bonus={:.2} -> {:.3}",
            profile.kind,
            breakdown.class_component,
            breakdown.timbral_component,
            breakdown.spectral_component,
            breakdown.bonus,
            breakdown.confidence
        );

        if breakdown.confidence < self.config.min_confidence {
            return None;
        }

        let tier = if class_score.is_some() {
            ClassifierTier::Preferred
        } else {
            ClassifierTier::Degraded
        };

        Some(Detection::new(
            profile.kind,
            breakdown.confidence,
            sample.timbral_vector,
            sample.rms_level,
            sample.captured_at,
            Diagnostics {
                class_score,
                timbral_distance: distance,
                spectral_gate_passed: gate_passed,
                tier,
            },
        ))
    }

    /// Component-level fusion for an already chosen candidate
    pub fn fuse(
        &self,
        profile: &HazardProfile,
        sample: &AggregatedSample,
        class_score: Option<f32>,
        timbral_distance: f32,
        gate_passed: bool,
    ) -> FusionBreakdown {
        let weights = self.config.effective_weights(class_score.is_some());

        let class_component = class_score
            .map(|sum| (sum / self.config.class_score_saturation).clamp(0.0, 1.0))
            .unwrap_or(0.0);
        let timbral_component = (1.0 - timbral_distance / profile.max_timbral_distance).max(0.0);
        let spectral_component = if gate_passed { 1.0 } else { 0.0 };

        let mut bonus = 0.0;
        if sample.rms_level >= self.config.rms_bonus_threshold {
            bonus += self.config.rms_bonus;
        }
        if sample.active_ratio() >= self.config.activity_bonus_ratio {
            bonus += self.config.activity_bonus;
        }

        let raw = weights.class * class_component
            + weights.timbral * timbral_component
            + weights.spectral * spectral_component
            + bonus;
        let confidence = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };

        FusionBreakdown {
            weights,
            class_component,
            timbral_component,
            spectral_component,
            bonus,
            confidence,
        }
    }

    /// Highest weighted class sum; first profile wins ties
    fn best_by_class_score(&self, scores: &ClassScores) -> Option<(&HazardProfile, f32)> {
        self.catalogue
            .profiles()
            .iter()
            .map(|p| (p, p.class_score(scores)))
            .fold(None, |best: Option<(&HazardProfile, f32)>, (p, sum)| match best {
                Some((_, best_sum)) if sum <= best_sum => best,
                _ => Some((p, sum)),
            })
    }

    fn nearest_by_timbre(&self, sample: &AggregatedSample) -> Option<&HazardProfile> {
        self.catalogue.profiles().iter().min_by(|a, b| {
            let da = euclidean_distance(&sample.timbral_vector, &a.expected_timbre);
            let db = euclidean_distance(&sample.timbral_vector, &b.expected_timbre);
            da.total_cmp(&db)
        })
    }
}
