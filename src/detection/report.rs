//! Persisted reports: acoustic detections and independently sourced reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{sanitize_confidence, Detection, Severity};
use crate::consensus::GeoPoint;

/// Intake path a report arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Acoustic,
    Photo,
    Manual,
}

impl Modality {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "acoustic" | "audio" => Some(Modality::Acoustic),
            "photo" | "image" => Some(Modality::Photo),
            "manual" | "text" => Some(Modality::Manual),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Modality::Acoustic => "acoustic",
            Modality::Photo => "photo",
            Modality::Manual => "manual",
        }
    }
}

/// Verification status. `Pending -> Verified` is the only transition this
/// crate performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Verified,
}

/// One record in the report store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub modality: Modality,
    /// Hazard label; acoustic reports use [`HazardKind::label`](crate::config::HazardKind::label)
    pub label: String,
    pub severity: Severity,
    pub confidence: f32,
    /// RMS level of the acoustic evidence, 0 for other modalities
    pub rms_level: f32,
    pub location: Option<GeoPoint>,
    pub reported_at: DateTime<Utc>,
    pub status: ReportStatus,
    /// Set once, when the report joins a cluster
    pub cluster_id: Option<Uuid>,
    /// Excludes the report from later triangulation searches; never reset
    pub triangulated: bool,
    /// Summary record produced by the triangulator, not a witness
    #[serde(default)]
    pub synthetic: bool,
    /// Recording or sensor the report came from; reports sharing a source
    /// are one witness, not several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub detection: Option<Detection>,
}

impl Report {
    /// Wrap a (calibrated) acoustic detection as a pending report
    pub fn from_detection(detection: Detection) -> Self {
        Self {
            id: Uuid::new_v4(),
            modality: Modality::Acoustic,
            label: detection.hazard.label().to_string(),
            severity: Severity::from_confidence(detection.confidence),
            confidence: sanitize_confidence(detection.confidence),
            rms_level: detection.rms_level,
            location: detection.location,
            reported_at: detection.timestamp,
            status: ReportStatus::Pending,
            cluster_id: None,
            triangulated: false,
            synthetic: false,
            source: None,
            detection: Some(detection),
        }
    }

    /// A report from another intake path (photo upload, manual entry)
    pub fn external(
        modality: Modality,
        label: impl Into<String>,
        severity: Severity,
        location: Option<GeoPoint>,
        reported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            modality,
            label: label.into(),
            severity,
            confidence: 1.0,
            rms_level: 0.0,
            location,
            reported_at,
            status: ReportStatus::Pending,
            cluster_id: None,
            triangulated: false,
            synthetic: false,
            source: None,
            detection: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Whether both reports name the same, known source
    pub fn shares_source(&self, other: &Report) -> bool {
        self.source.is_some() && self.source == other.source
    }

    /// Set the confidence, keeping the embedded detection in step
    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = confidence;
        if let Some(detection) = self.detection.as_mut() {
            detection.confidence = confidence;
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == ReportStatus::Verified
    }
}
