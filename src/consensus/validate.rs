// src/consensus/validate.rs
//
// Cross-Modal Validator: corroborates a report with the nearest report from
// a different intake path, close in space and time.
//
// The boost is one-directional and applied at most once per report: a
// verified report is skipped, and no match leaves the report untouched.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::store::{ReportSet, ReportStore};
use super::SkipReason;
use crate::config::ValidationConfig;
use crate::detection::{Modality, ReportStatus};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Validated,
    NoCorrelation,
    Skipped,
}

/// Link between a report and its best corroborating match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub report_id: Uuid,
    pub modality: Modality,
    pub distance_m: f64,
    /// Match timestamp minus report timestamp
    pub time_offset_secs: i64,
}

/// Result of one validation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub status: ValidationStatus,
    pub best_match: Option<Correlation>,
    pub confidence_delta: f32,
    pub skip_reason: Option<SkipReason>,
}

impl ValidationOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            status: ValidationStatus::Skipped,
            best_match: None,
            confidence_delta: 0.0,
            skip_reason: Some(reason),
        }
    }

    fn no_correlation() -> Self {
        Self {
            status: ValidationStatus::NoCorrelation,
            best_match: None,
            confidence_delta: 0.0,
            skip_reason: None,
        }
    }
}

/// `min(1, confidence * boost)`
pub fn boosted_confidence(confidence: f32, boost: f32) -> f32 {
    (confidence * boost).min(1.0)
}

pub struct CrossModalValidator {
    config: ValidationConfig,
}

impl CrossModalValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Look for corroboration of a newly persisted report
    pub fn validate<S: ReportStore>(
        &self,
        store: &S,
        report_id: Uuid,
    ) -> Result<ValidationOutcome, StoreError> {
        store.transaction(|set| self.validate_in(set, report_id))
    }

    fn validate_in(&self, set: &mut ReportSet, report_id: Uuid) -> Result<ValidationOutcome, StoreError> {
        let report = set.require(report_id)?;

        if report.synthetic {
            return Ok(ValidationOutcome::skipped(SkipReason::SyntheticRecord));
        }
        if report.status == ReportStatus::Verified {
            return Ok(ValidationOutcome::skipped(SkipReason::AlreadyVerified));
        }
        let Some(center) = report.location else {
            return Ok(ValidationOutcome::skipped(SkipReason::MissingLocation));
        };

        let modality = report.modality;
        let reported_at = report.reported_at;
        let window = self.config.window_secs;

        let candidates = set.nearby(&center, self.config.radius_m, self.config.max_candidates, |r| {
            r.id != report_id
                && r.modality != modality
                && !r.synthetic
                && within_window(reported_at, r.reported_at, window)
        });

        // Nearest first; among equals the closest in time
        let best = candidates
            .iter()
            .min_by(|a, b| {
                a.0.total_cmp(&b.0).then_with(|| {
                    offset_secs(reported_at, a.1.reported_at)
                        .abs()
                        .cmp(&offset_secs(reported_at, b.1.reported_at).abs())
                })
            })
            .map(|(distance, r)| Correlation {
                report_id: r.id,
                modality: r.modality,
                distance_m: *distance,
                time_offset_secs: offset_secs(reported_at, r.reported_at),
            });

        let Some(best) = best else {
            debug!("no cross-modal match for {report_id}");
            return Ok(ValidationOutcome::no_correlation());
        };

        let report = set.require_mut(report_id)?;
        let before = report.confidence;
        report.set_confidence(boosted_confidence(before, self.config.boost));
        report.status = ReportStatus::Verified;
        let delta = report.confidence - before;

        info!(
            "verified {report_id} via {} report {} ({:.1} m, {:+} s), confidence {:.3} -> {:.3}",
            best.modality.name(),
            best.report_id,
            best.distance_m,
            best.time_offset_secs,
            before,
            report.confidence
        );

        Ok(ValidationOutcome {
            status: ValidationStatus::Validated,
            best_match: Some(best),
            confidence_delta: delta,
            skip_reason: None,
        })
    }
}

fn offset_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds()
}

fn within_window(a: DateTime<Utc>, b: DateTime<Utc>, window_secs: i64) -> bool {
    (b - a).abs() <= Duration::seconds(window_secs)
}
