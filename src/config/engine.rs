// src/config/engine.rs
//
// Tunable thresholds for every stage of the engine. All structs default to
// the production constants and deserialize with `#[serde(default)]`, so a
// config file only has to name the values it overrides.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV_VAR: &str = "HAZARDFUSION_CONFIG";

/// Feature Aggregator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Frames with RMS below this are not counted as active
    pub min_frame_rms: f32,
    /// Active frames required for a complete sample
    pub min_active_frames: usize,
    /// Fixed confidence reported for an insufficient-data sample
    pub insufficient_data_confidence: f32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            min_frame_rms: 0.005,
            min_active_frames: 2,
            insufficient_data_confidence: 0.2,
        }
    }
}

/// Fusion Classifier weights and gates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub class_weight: f32,
    pub timbral_weight: f32,
    pub spectral_weight: f32,
    /// Class-score sum at which the class component saturates to 1
    pub class_score_saturation: f32,
    /// Candidate rejected below this class-score sum (external scores present)
    pub min_class_score: f32,
    /// Fused confidence floor; below it the classifier returns nothing
    pub min_confidence: f32,
    pub rms_bonus_threshold: f32,
    pub rms_bonus: f32,
    /// Active-frame ratio at which the activity bonus applies
    pub activity_bonus_ratio: f32,
    pub activity_bonus: f32,
    /// Ceiling of the heuristic fallback classifier's confidence
    pub heuristic_base_confidence: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            class_weight: 0.40,
            timbral_weight: 0.35,
            spectral_weight: 0.25,
            class_score_saturation: 0.5,
            min_class_score: 0.10,
            min_confidence: 0.30,
            rms_bonus_threshold: 0.05,
            rms_bonus: 0.05,
            activity_bonus_ratio: 0.6,
            activity_bonus: 0.05,
            heuristic_base_confidence: 0.35,
        }
    }
}

/// Component weights actually used for one classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub class: f32,
    pub timbral: f32,
    pub spectral: f32,
}

impl FusionConfig {
    /// Weights for the active components. Without external scores the class
    /// weight is dropped and the other two are rescaled to sum to exactly 1.
    pub fn effective_weights(&self, external_available: bool) -> FusionWeights {
        if external_available {
            return FusionWeights {
                class: self.class_weight,
                timbral: self.timbral_weight,
                spectral: self.spectral_weight,
            };
        }

        let active = self.timbral_weight + self.spectral_weight;
        let timbral = self.timbral_weight / active;
        FusionWeights {
            class: 0.0,
            timbral,
            spectral: 1.0 - timbral,
        }
    }
}

/// Spatial Triangulator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationConfig {
    pub radius_m: f64,
    /// Cluster size (new detection included) required to triangulate
    pub min_members: usize,
    /// Nearest neighbours considered per run
    pub max_candidates: usize,
    /// Persist a synthetic record summarising each new cluster
    pub emit_source_record: bool,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            radius_m: 50.0,
            min_members: 3,
            max_candidates: 20,
            emit_source_record: true,
        }
    }
}

/// Cross-Modal Validator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub radius_m: f64,
    /// Half-width of the time window, in seconds
    pub window_secs: i64,
    /// Relative confidence multiplier applied on corroboration
    pub boost: f32,
    pub max_candidates: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            radius_m: 100.0,
            window_secs: 2 * 60 * 60,
            boost: 1.10,
            max_candidates: 20,
        }
    }
}

/// What the capture loop does when the classifier is still busy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backpressure {
    /// Wait for the classifier (offline files: every window is analysed)
    Block,
    /// Drop the completed window and keep capturing (live sensors)
    DropWhileAnalyzing,
}

/// Capture loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Samples per audio frame
    pub frame_size: usize,
    /// Wall-clock length of one collection window
    pub window_secs: f64,
    /// Hard cap on frames buffered per window
    pub max_frames_per_window: usize,
    pub backpressure: Backpressure,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            window_secs: 3.0,
            max_frames_per_window: 512,
            backpressure: Backpressure::Block,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub aggregator: AggregatorConfig,
    pub fusion: FusionConfig,
    pub triangulation: TriangulationConfig,
    pub validation: ValidationConfig,
    pub capture: CaptureConfig,
}

impl EngineConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config file: explicit env var, then the user config
    /// directory, then built-in defaults.
    pub fn discover() -> Result<Self, ConfigError> {
        match Self::discover_path() {
            Some(path) => {
                debug!("loading engine config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn discover_path() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
            if !explicit.is_empty() {
                return Some(PathBuf::from(explicit));
            }
        }
        dirs::config_dir()
            .map(|dir| dir.join("hazardfusion").join("config.json"))
            .filter(|path| path.is_file())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fusion = &self.fusion;
        let weights = [fusion.class_weight, fusion.timbral_weight, fusion.spectral_weight];
        if weights.iter().any(|w| !(*w > 0.0)) {
            return Err(ConfigError::Invalid("fusion weights must be positive".to_string()));
        }
        let total: f32 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-4 {
            return Err(ConfigError::Invalid(format!(
                "fusion weights must sum to 1.0, got {total:.4}"
            )));
        }
        if !(fusion.class_score_saturation > 0.0) {
            return Err(ConfigError::Invalid(
                "class score saturation must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&fusion.min_confidence) {
            return Err(ConfigError::Invalid(
                "minimum fused confidence must be within [0, 1]".to_string(),
            ));
        }
        let insufficient = self.aggregator.insufficient_data_confidence;
        if !(insufficient > 0.0 && insufficient <= 1.0) {
            return Err(ConfigError::Invalid(
                "insufficient-data confidence must be within (0, 1]".to_string(),
            ));
        }
        if !(self.triangulation.radius_m > 0.0) || !(self.validation.radius_m > 0.0) {
            return Err(ConfigError::Invalid("search radii must be positive".to_string()));
        }
        if self.triangulation.min_members < 2 {
            return Err(ConfigError::Invalid(
                "a cluster needs at least 2 members".to_string(),
            ));
        }
        if self.triangulation.max_candidates == 0 || self.validation.max_candidates == 0 {
            return Err(ConfigError::Invalid(
                "candidate limits must be at least 1".to_string(),
            ));
        }
        if self.validation.window_secs < 0 || !(self.validation.boost >= 1.0) {
            return Err(ConfigError::Invalid(
                "validation window must be non-negative and the boost at least 1.0".to_string(),
            ));
        }
        if self.capture.frame_size < 64 || !(self.capture.window_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "frame size must be at least 64 samples and the window positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for engine configurations
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn min_frame_rms(mut self, rms: f32) -> Self {
        self.config.aggregator.min_frame_rms = rms.max(0.0);
        self
    }

    pub fn min_confidence(mut self, threshold: f32) -> Self {
        self.config.fusion.min_confidence = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn triangulation_radius(mut self, meters: f64) -> Self {
        self.config.triangulation.radius_m = meters;
        self
    }

    pub fn validation_radius(mut self, meters: f64) -> Self {
        self.config.validation.radius_m = meters;
        self
    }

    pub fn validation_window_secs(mut self, secs: i64) -> Self {
        self.config.validation.window_secs = secs;
        self
    }

    pub fn frame_size(mut self, samples: usize) -> Self {
        self.config.capture.frame_size = samples;
        self
    }

    pub fn window_secs(mut self, secs: f64) -> Self {
        self.config.capture.window_secs = secs;
        self
    }

    pub fn backpressure(mut self, policy: Backpressure) -> Self {
        self.config.capture.backpressure = policy;
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_redistributed_weights_sum_to_one() {
        let weights = FusionConfig::default().effective_weights(false);
        assert_eq!(weights.class, 0.0);
        assert_eq!(weights.timbral + weights.spectral, 1.0);
        assert!((weights.timbral - 0.35 / 0.60).abs() < 1e-6);
        assert!((weights.spectral - 0.25 / 0.60).abs() < 1e-6);
    }

    #[test]
    fn test_full_weights_when_external_available() {
        let weights = FusionConfig::default().effective_weights(true);
        assert_eq!(weights.class, 0.40);
        assert_eq!(weights.timbral, 0.35);
        assert_eq!(weights.spectral, 0.25);
    }

    #[test]
    fn test_partial_json_overrides_only_named_fields() {
        let json = r#"{ "triangulation": { "radius_m": 75.0 }, "validation": { "boost": 1.2 } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.triangulation.radius_m, 75.0);
        assert_eq!(config.triangulation.min_members, 3);
        assert!((config.validation.boost - 1.2).abs() < 1e-6);
        assert_eq!(config.validation.window_secs, 7200);
        config.validate().unwrap();
    }

    #[test]
    fn test_builder_rejects_bad_radius() {
        assert!(EngineConfigBuilder::new().triangulation_radius(0.0).build().is_err());
        assert!(EngineConfigBuilder::new().validation_radius(-5.0).build().is_err());
    }

    #[test]
    fn test_builder_applies_overrides() {
        let config = EngineConfigBuilder::new()
            .min_confidence(0.4)
            .window_secs(1.5)
            .backpressure(Backpressure::DropWhileAnalyzing)
            .build()
            .unwrap();

        assert_eq!(config.fusion.min_confidence, 0.4);
        assert_eq!(config.capture.window_secs, 1.5);
        assert_eq!(config.capture.backpressure, Backpressure::DropWhileAnalyzing);
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.json"));
    }
}
