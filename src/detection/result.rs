//! Classifier output types and confidence invariants

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::HazardKind;
use crate::consensus::GeoPoint;
use crate::core::dsp::TIMBRAL_DIMS;

/// Replacement for a confidence that is zero, negative or not finite.
///
/// Downstream consumers read 0 as "field absent", so a zero confidence is
/// treated as an invariant violation rather than a legitimate value.
pub const DEFAULT_CONFIDENCE: f32 = 0.1;

/// Clamp a confidence into (0, 1], replacing invalid values with
/// [`DEFAULT_CONFIDENCE`].
pub fn sanitize_confidence(confidence: f32) -> f32 {
    if !confidence.is_finite() || confidence <= 0.0 {
        warn!(
            "confidence {confidence} is not a usable value, substituting {DEFAULT_CONFIDENCE}"
        );
        return DEFAULT_CONFIDENCE;
    }
    confidence.min(1.0)
}

/// Severity level of a hazard report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_confidence(confidence: f32) -> Self {
        match confidence {
            c if c >= 0.85 => Severity::Critical,
            c if c >= 0.65 => Severity::High,
            c if c >= 0.45 => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// Ordinal used for averaging: LOW=1 .. CRITICAL=4
    pub fn ordinal(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(Severity::Low),
            2 => Some(Severity::Medium),
            3 => Some(Severity::High),
            4 => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Mean ordinal rounded to the nearest level, halves rounding down
    pub fn average<I: IntoIterator<Item = Severity>>(levels: I) -> Option<Self> {
        let (sum, count) = levels
            .into_iter()
            .fold((0u32, 0u32), |(s, n), level| (s + level.ordinal() as u32, n + 1));
        if count == 0 {
            return None;
        }
        // round-half-down on sum/count, in integers: ceil(sum/count - 1/2)
        let rounded = (2 * sum + count - 1) / (2 * count);
        Self::from_ordinal(rounded.clamp(1, 4) as u8)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Low => "ℹ",
            Severity::Medium => "⚠",
            Severity::High => "⚠",
            Severity::Critical => "✗",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Which tier of the fallback chain produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierTier {
    /// External class scores fed the class-score gate
    Preferred,
    /// No external scores; timbral and spectral gates only
    Degraded,
    /// Fusion rejected the sample; simple range-matching classifier
    Heuristic,
}

/// Audit trail of the gates behind one detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Weighted class-score sum; `None` when no external scores were available
    pub class_score: Option<f32>,
    pub timbral_distance: f32,
    pub spectral_gate_passed: bool,
    pub tier: ClassifierTier,
}

/// A classified hazard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub hazard: HazardKind,
    pub confidence: f32,
    pub timbral_vector: [f32; TIMBRAL_DIMS],
    pub rms_level: f32,
    pub timestamp: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub diagnostics: Diagnostics,
    /// Reporter trust captured when calibration was applied; `None` until then
    #[serde(default)]
    pub calibrated_with_trust: Option<f32>,
}

impl Detection {
    pub fn new(
        hazard: HazardKind,
        confidence: f32,
        timbral_vector: [f32; TIMBRAL_DIMS],
        rms_level: f32,
        timestamp: DateTime<Utc>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            hazard,
            confidence: sanitize_confidence(confidence),
            timbral_vector,
            rms_level,
            timestamp,
            location: None,
            diagnostics,
            calibrated_with_trust: None,
        }
    }

    pub fn with_location(mut self, location: Option<GeoPoint>) -> Self {
        self.location = location;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_confidence() {
        assert_eq!(Severity::from_confidence(0.9), Severity::Critical);
        assert_eq!(Severity::from_confidence(0.7), Severity::High);
        assert_eq!(Severity::from_confidence(0.5), Severity::Medium);
        assert_eq!(Severity::from_confidence(0.2), Severity::Low);
    }

    #[test]
    fn test_severity_average_rounds_half_down() {
        use Severity::*;
        // (2 + 3) / 2 = 2.5 -> MEDIUM
        assert_eq!(Severity::average([Medium, High]), Some(Medium));
        // (3 + 4 + 4) / 3 = 3.67 -> CRITICAL
        assert_eq!(Severity::average([High, Critical, Critical]), Some(Critical));
        // (1 + 1 + 2) / 3 = 1.33 -> LOW
        assert_eq!(Severity::average([Low, Low, Medium]), Some(Low));
        // (1 + 4) / 2 = 2.5 -> MEDIUM
        assert_eq!(Severity::average([Low, Critical]), Some(Medium));
        assert_eq!(Severity::average([High]), Some(High));
        assert_eq!(Severity::average(Vec::new()), None);
    }

    #[test]
    fn test_sanitize_confidence() {
        assert_eq!(sanitize_confidence(0.0), DEFAULT_CONFIDENCE);
        assert_eq!(sanitize_confidence(-0.3), DEFAULT_CONFIDENCE);
        assert_eq!(sanitize_confidence(f32::NAN), DEFAULT_CONFIDENCE);
        assert_eq!(sanitize_confidence(1.7), 1.0);
        assert_eq!(sanitize_confidence(0.42), 0.42);
    }

    #[test]
    fn test_severity_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"CRITICAL\"");
        assert_eq!(Severity::from_name("high"), Some(Severity::High));
    }
}
