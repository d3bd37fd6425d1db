//! Multi-report consensus: spatial triangulation and cross-modal validation
//!
//! Both algorithms run per incoming report against a shared [`ReportStore`],
//! inside a store transaction. "No consensus yet" outcomes are values; only
//! storage failures are errors.

mod geo;
mod store;
mod triangulate;
mod validate;

use serde::{Deserialize, Serialize};

pub use geo::{haversine_distance, weighted_centroid, GeoPoint, EARTH_RADIUS_M};
pub use store::{InMemoryReportStore, JsonFileReportStore, ReportSet, ReportStore};
pub use triangulate::{TriangulationOutcome, TriangulationStatus, Triangulator};
pub use validate::{
    boosted_confidence, Correlation, CrossModalValidator, ValidationOutcome, ValidationStatus,
};

/// Why a consensus pass did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    MissingLocation,
    AlreadyClustered,
    AlreadyVerified,
    NotAcoustic,
    SyntheticRecord,
}

impl SkipReason {
    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::MissingLocation => "report has no location",
            SkipReason::AlreadyClustered => "report already belongs to a cluster",
            SkipReason::AlreadyVerified => "report is already verified",
            SkipReason::NotAcoustic => "only acoustic detections are triangulated",
            SkipReason::SyntheticRecord => "report is a triangulated-source summary",
        }
    }
}
