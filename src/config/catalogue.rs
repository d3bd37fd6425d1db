// src/config/catalogue.rs
//
// Reference catalogue of infrastructure-hazard sound signatures.
// One profile per hazard: weighted external-classifier classes, an expected
// timbral (MFCC) vector, and the spectral ranges used by the spectral gate.

use serde::{Deserialize, Serialize};

use crate::core::dsp::TIMBRAL_DIMS;
use crate::detection::Severity;
use crate::error::ConfigError;

/// The fixed set of hazard categories the classifier can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HazardKind {
    #[serde(rename = "Hissing/Sizzling")]
    HissingSizzling,
    #[serde(rename = "Electrical Buzzing")]
    ElectricalBuzzing,
    #[serde(rename = "Electrical Arcing")]
    ElectricalArcing,
    #[serde(rename = "Dripping/Leaking Water")]
    WaterLeak,
    #[serde(rename = "Gushing Water")]
    GushingWater,
    #[serde(rename = "Structural Creaking")]
    StructuralCreaking,
    #[serde(rename = "Explosion/Bang")]
    ExplosionBang,
    #[serde(rename = "Alarm/Siren")]
    AlarmSiren,
    #[serde(rename = "Grinding/Scraping")]
    GrindingScraping,
    #[serde(rename = "Fire Crackling")]
    FireCrackling,
}

impl HazardKind {
    pub fn all() -> Vec<Self> {
        vec![
            Self::HissingSizzling,
            Self::ElectricalBuzzing,
            Self::ElectricalArcing,
            Self::WaterLeak,
            Self::GushingWater,
            Self::StructuralCreaking,
            Self::ExplosionBang,
            Self::AlarmSiren,
            Self::GrindingScraping,
            Self::FireCrackling,
        ]
    }

    /// Human-readable label, also the persisted report label
    pub fn label(&self) -> &'static str {
        match self {
            Self::HissingSizzling => "Hissing/Sizzling",
            Self::ElectricalBuzzing => "Electrical Buzzing",
            Self::ElectricalArcing => "Electrical Arcing",
            Self::WaterLeak => "Dripping/Leaking Water",
            Self::GushingWater => "Gushing Water",
            Self::StructuralCreaking => "Structural Creaking",
            Self::ExplosionBang => "Explosion/Bang",
            Self::AlarmSiren => "Alarm/Siren",
            Self::GrindingScraping => "Grinding/Scraping",
            Self::FireCrackling => "Fire Crackling",
        }
    }

    /// Short CLI-friendly identifier
    pub fn name(&self) -> &'static str {
        match self {
            Self::HissingSizzling => "hissing",
            Self::ElectricalBuzzing => "buzzing",
            Self::ElectricalArcing => "arcing",
            Self::WaterLeak => "leak",
            Self::GushingWater => "gushing",
            Self::StructuralCreaking => "creaking",
            Self::ExplosionBang => "explosion",
            Self::AlarmSiren => "alarm",
            Self::GrindingScraping => "grinding",
            Self::FireCrackling => "fire",
        }
    }

    /// Parse either the short name or the full label (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_lowercase();
        Self::all()
            .into_iter()
            .find(|k| k.name() == wanted || k.label().to_lowercase() == wanted)
    }
}

impl std::fmt::Display for HazardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed interval `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub low: f32,
    pub high: f32,
}

impl ValueRange {
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.low && value <= self.high
    }
}

/// One external-classifier class and its contribution weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedClass {
    pub class: String,
    pub weight: f32,
}

/// Static signature of one hazard category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardProfile {
    pub kind: HazardKind,
    pub classes: Vec<WeightedClass>,
    pub expected_timbre: [f32; TIMBRAL_DIMS],
    pub flatness: ValueRange,
    pub sharpness: ValueRange,
    /// Reference timbral distance. Rejection threshold when no external
    /// scores are available, and the normaliser of the timbral component.
    pub max_timbral_distance: f32,
    /// Severity assumed for reports of this hazard when none is given
    pub default_severity: Severity,
}

impl HazardProfile {
    fn new(
        kind: HazardKind,
        classes: &[(&str, f32)],
        expected_timbre: [f32; TIMBRAL_DIMS],
        flatness: (f32, f32),
        sharpness: (f32, f32),
        max_timbral_distance: f32,
        default_severity: Severity,
    ) -> Self {
        Self {
            kind,
            classes: classes
                .iter()
                .map(|&(class, weight)| WeightedClass {
                    class: class.to_string(),
                    weight,
                })
                .collect(),
            expected_timbre,
            flatness: ValueRange::new(flatness.0, flatness.1),
            sharpness: ValueRange::new(sharpness.0, sharpness.1),
            max_timbral_distance,
            default_severity,
        }
    }

    /// Check the profile invariants: positive weights, well-ordered ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classes.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "profile {} has no weighted classes",
                self.kind
            )));
        }
        if let Some(bad) = self.classes.iter().find(|c| !(c.weight > 0.0)) {
            return Err(ConfigError::Invalid(format!(
                "profile {}: class '{}' has non-positive weight {}",
                self.kind, bad.class, bad.weight
            )));
        }
        for (name, range) in [("flatness", self.flatness), ("sharpness", self.sharpness)] {
            if !(range.low <= range.high) {
                return Err(ConfigError::Invalid(format!(
                    "profile {}: {} range [{}, {}] is inverted",
                    self.kind, name, range.low, range.high
                )));
            }
        }
        if !(self.max_timbral_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "profile {}: timbral distance threshold must be positive",
                self.kind
            )));
        }
        Ok(())
    }

    /// Weighted sum of external class scores; missing classes contribute 0
    pub fn class_score(&self, scores: &std::collections::HashMap<String, f32>) -> f32 {
        self.classes
            .iter()
            .map(|c| scores.get(&c.class).copied().unwrap_or(0.0) * c.weight)
            .sum()
    }

    /// Spectral gate: flatness and sharpness both inside the expected ranges
    pub fn spectral_gate(&self, flatness: f32, sharpness: f32) -> bool {
        self.flatness.contains(flatness) && self.sharpness.contains(sharpness)
    }
}

/// The set of hazard profiles the classifiers match against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalogue {
    profiles: Vec<HazardProfile>,
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalogue {
    /// Build a catalogue from explicit profiles, checking their invariants
    pub fn from_profiles(profiles: Vec<HazardProfile>) -> Result<Self, ConfigError> {
        if profiles.is_empty() {
            return Err(ConfigError::Invalid("catalogue is empty".to_string()));
        }
        for profile in &profiles {
            profile.validate()?;
        }
        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[HazardProfile] {
        &self.profiles
    }

    pub fn profile(&self, kind: HazardKind) -> Option<&HazardProfile> {
        self.profiles.iter().find(|p| p.kind == kind)
    }

    /// Built-in ten-category catalogue
    pub fn standard() -> Self {
        use HazardKind::*;
        use Severity::*;

        let profiles = vec![
            HazardProfile::new(
                HissingSizzling,
                &[("Hiss", 1.0), ("Steam", 0.9), ("Sizzle", 0.8), ("White noise", 0.3)],
                [-12.0, -4.0, -9.0, -2.0, -4.0, -1.5, -2.5, -1.0, -1.5, -0.5, -1.0, -0.5, -0.5],
                (0.30, 1.00),
                (1.60, 6.00),
                50.0,
                High,
            ),
            HazardProfile::new(
                ElectricalBuzzing,
                &[("Buzz", 1.0), ("Mains hum", 1.0), ("Hum", 0.8), ("Electric shaver, electric razor", 0.3)],
                [-48.0, 22.0, 6.0, 9.0, 1.0, 4.0, -1.0, 2.0, -1.0, 1.0, -0.5, 0.5, 0.0],
                (0.00, 0.25),
                (0.30, 1.80),
                55.0,
                High,
            ),
            HazardProfile::new(
                ElectricalArcing,
                &[("Crackle", 0.9), ("Zap", 1.0), ("Static", 0.7), ("Sizzle", 0.4)],
                [-26.0, 6.0, -6.0, 1.0, -3.0, 0.5, -2.0, 0.0, -1.0, 0.0, -0.5, 0.0, -0.5],
                (0.20, 0.80),
                (1.40, 5.00),
                50.0,
                Critical,
            ),
            HazardProfile::new(
                WaterLeak,
                &[("Drip", 1.0), ("Trickle, dribble", 0.9), ("Water tap, faucet", 0.6), ("Liquid", 0.4)],
                [-62.0, 18.0, 2.0, 5.0, 0.0, 2.0, 0.0, 1.0, 0.0, 0.5, 0.0, 0.5, 0.0],
                (0.05, 0.45),
                (0.80, 2.80),
                60.0,
                Medium,
            ),
            HazardProfile::new(
                GushingWater,
                &[("Gush", 1.0), ("Water", 0.5), ("Pour", 0.6), ("Stream", 0.6)],
                [-16.0, 12.0, -3.0, 2.0, -1.0, 1.0, -1.0, 0.5, -0.5, 0.5, -0.5, 0.0, 0.0],
                (0.25, 0.85),
                (0.90, 3.20),
                55.0,
                High,
            ),
            HazardProfile::new(
                StructuralCreaking,
                &[("Creak", 1.0), ("Crack", 0.8), ("Squeak", 0.5)],
                [-55.0, 25.0, 8.0, 4.0, 3.0, 1.0, 1.0, 0.0, 0.5, 0.0, 0.5, 0.0, 0.0],
                (0.00, 0.30),
                (0.60, 2.20),
                55.0,
                High,
            ),
            HazardProfile::new(
                ExplosionBang,
                &[("Explosion", 1.0), ("Bang", 0.9), ("Boom", 0.9), ("Burst, pop", 0.5)],
                [-8.0, 30.0, 5.0, 6.0, 2.0, 2.0, 1.0, 1.0, 0.5, 0.5, 0.0, 0.0, 0.0],
                (0.10, 0.70),
                (0.40, 2.00),
                60.0,
                Critical,
            ),
            HazardProfile::new(
                AlarmSiren,
                &[("Alarm", 1.0), ("Siren", 0.9), ("Smoke detector, smoke alarm", 1.0), ("Beep, bleep", 0.4)],
                [-32.0, -2.0, 10.0, -8.0, 6.0, -4.0, 3.0, -2.0, 1.5, -1.0, 1.0, -0.5, 0.5],
                (0.00, 0.20),
                (1.20, 4.00),
                50.0,
                Medium,
            ),
            HazardProfile::new(
                GrindingScraping,
                &[("Grinding", 1.0), ("Scrape", 0.8), ("Squeal", 0.6), ("Sawing", 0.4)],
                [-20.0, 4.0, -4.0, 0.0, -2.0, 0.0, -1.0, 0.0, -0.5, 0.0, -0.5, 0.0, 0.0],
                (0.10, 0.60),
                (1.20, 4.50),
                50.0,
                Medium,
            ),
            HazardProfile::new(
                FireCrackling,
                &[("Fire", 1.0), ("Crackle", 0.7), ("Wood", 0.2)],
                [-36.0, 10.0, -2.0, 2.0, -1.0, 1.0, -0.5, 0.5, -0.5, 0.0, 0.0, 0.0, 0.0],
                (0.20, 0.75),
                (1.00, 3.50),
                55.0,
                Critical,
            ),
        ];

        Self { profiles }
    }
}
