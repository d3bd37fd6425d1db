//! Configuration module for hazardfusion

mod catalogue;
mod engine;

pub use catalogue::{Catalogue, HazardKind, HazardProfile, ValueRange, WeightedClass};
pub use engine::{
    AggregatorConfig, Backpressure, CaptureConfig, EngineConfig, EngineConfigBuilder,
    FusionConfig, FusionWeights, TriangulationConfig, ValidationConfig, CONFIG_ENV_VAR,
};
