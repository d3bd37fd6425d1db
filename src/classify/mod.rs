//! Hazard classification: fusion gates, heuristic fallback, calibration
//!
//! [`ClassificationPipeline`] wires the tiers together and runs them on a
//! worker thread fed by a [`CaptureSession`](crate::core::capture::CaptureSession).

pub mod calibrate;
pub mod external;
pub mod fusion;
pub mod heuristic;
pub mod pipeline;

pub use calibrate::{calibrated_confidence, Calibrator, DEFAULT_TRUST};
pub use external::{AcousticEventClassifier, ClassScores, StaticScores, Unavailable};
pub use fusion::{FusionBreakdown, FusionClassifier};
pub use heuristic::HeuristicClassifier;
pub use pipeline::{ClassificationOutcome, ClassificationPipeline, SessionSummary, WindowOutcome};
