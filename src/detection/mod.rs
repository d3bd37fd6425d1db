//! Detection module for hazardfusion

mod report;
mod result;

pub use report::{Modality, Report, ReportStatus};
pub use result::{
    sanitize_confidence, ClassifierTier, Detection, Diagnostics, Severity, DEFAULT_CONFIDENCE,
};
