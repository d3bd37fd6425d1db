// src/consensus/triangulate.rs
//
// Spatial Triangulator: fuses independent acoustic detections of the same
// hazard within a small radius into one cluster with a refined location.
//
// Cluster membership is permanent. Once a report is triangulated it is never
// considered again, even if a later report would form a tighter cluster.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geo::{weighted_centroid, GeoPoint};
use super::store::{ReportSet, ReportStore};
use super::SkipReason;
use crate::config::TriangulationConfig;
use crate::detection::{sanitize_confidence, Modality, Report, ReportStatus, Severity};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriangulationStatus {
    Triangulated,
    InsufficientData,
    Skipped,
}

/// Result of one triangulation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangulationOutcome {
    pub status: TriangulationStatus,
    pub cluster_id: Option<Uuid>,
    pub refined_location: Option<GeoPoint>,
    /// Size of the matched set, the new report included
    pub member_count: usize,
    /// Matched reports; on insufficient data this is the partial set
    pub members: Vec<Uuid>,
    /// Synthetic triangulated-source record, when one was written
    pub source_record: Option<Uuid>,
    pub skip_reason: Option<SkipReason>,
}

impl TriangulationOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            status: TriangulationStatus::Skipped,
            cluster_id: None,
            refined_location: None,
            member_count: 0,
            members: Vec::new(),
            source_record: None,
            skip_reason: Some(reason),
        }
    }
}

pub struct Triangulator {
    config: TriangulationConfig,
}

impl Triangulator {
    pub fn new(config: TriangulationConfig) -> Self {
        Self { config }
    }

    /// Try to form a cluster around a newly persisted report
    pub fn triangulate<S: ReportStore>(
        &self,
        store: &S,
        report_id: Uuid,
    ) -> Result<TriangulationOutcome, StoreError> {
        store.transaction(|set| self.triangulate_in(set, report_id))
    }

    fn triangulate_in(
        &self,
        set: &mut ReportSet,
        report_id: Uuid,
    ) -> Result<TriangulationOutcome, StoreError> {
        let report = set.require(report_id)?;

        if report.synthetic {
            return Ok(TriangulationOutcome::skipped(SkipReason::SyntheticRecord));
        }
        if report.modality != Modality::Acoustic {
            return Ok(TriangulationOutcome::skipped(SkipReason::NotAcoustic));
        }
        if report.triangulated {
            return Ok(TriangulationOutcome::skipped(SkipReason::AlreadyClustered));
        }
        let Some(center) = report.location else {
            return Ok(TriangulationOutcome::skipped(SkipReason::MissingLocation));
        };

        let label = report.label.clone();
        let neighbours = set.nearby(&center, self.config.radius_m, usize::MAX, |r| {
            r.id != report_id
                && r.modality == Modality::Acoustic
                && !r.synthetic
                && !r.triangulated
                && r.label == label
        });

        // One witness per source, nearest first
        let mut witnesses: Vec<&Report> = vec![report];
        for (_, candidate) in &neighbours {
            if witnesses.len() >= self.config.max_candidates {
                break;
            }
            if !witnesses.iter().any(|w| w.shares_source(candidate)) {
                witnesses.push(*candidate);
            }
        }
        let members: Vec<Uuid> = witnesses.iter().map(|w| w.id).collect();
        debug!(
            "triangulation of {report_id}: {} same-label neighbours within {} m, {} independent",
            neighbours.len(),
            self.config.radius_m,
            members.len() - 1
        );

        if members.len() < self.config.min_members {
            return Ok(TriangulationOutcome {
                status: TriangulationStatus::InsufficientData,
                cluster_id: None,
                refined_location: None,
                member_count: members.len(),
                members,
                source_record: None,
                skip_reason: None,
            });
        }

        let mut weighted = Vec::with_capacity(members.len());
        for id in &members {
            let member = set.require(*id)?;
            if let Some(location) = member.location {
                weighted.push((location, member.rms_level as f64));
            }
        }
        let refined = weighted_centroid(&weighted);

        let cluster_id = Uuid::new_v4();
        for id in &members {
            let member = set.require_mut(*id)?;
            member.cluster_id = Some(cluster_id);
            member.triangulated = true;
        }

        let source_record = if self.config.emit_source_record {
            Some(Self::write_source_record(set, &members, &label, refined, cluster_id)?)
        } else {
            None
        };

        info!(
            "formed cluster {cluster_id} of {} '{label}' reports{}",
            members.len(),
            refined.map(|p| format!(" at {p}")).unwrap_or_default()
        );

        Ok(TriangulationOutcome {
            status: TriangulationStatus::Triangulated,
            cluster_id: Some(cluster_id),
            refined_location: refined,
            member_count: members.len(),
            members,
            source_record,
            skip_reason: None,
        })
    }

    /// Summary record standing for the cluster's estimated source
    fn write_source_record(
        set: &mut ReportSet,
        members: &[Uuid],
        label: &str,
        location: Option<GeoPoint>,
        cluster_id: Uuid,
    ) -> Result<Uuid, StoreError> {
        let mut severities = Vec::with_capacity(members.len());
        let mut confidence = 0.0f32;
        let mut rms = 0.0f32;
        let mut latest = None;
        for id in members {
            let m = set.require(*id)?;
            severities.push(m.severity);
            confidence += m.confidence;
            rms += m.rms_level;
            latest = latest.max(Some(m.reported_at));
        }
        let n = members.len() as f32;

        let record = Report {
            id: Uuid::new_v4(),
            modality: Modality::Acoustic,
            label: label.to_string(),
            severity: Severity::average(severities).unwrap_or(Severity::Low),
            confidence: sanitize_confidence(confidence / n),
            rms_level: rms / n,
            location,
            reported_at: latest.unwrap_or_else(chrono::Utc::now),
            status: ReportStatus::Pending,
            cluster_id: Some(cluster_id),
            triangulated: true,
            synthetic: true,
            source: None,
            detection: None,
        };
        Ok(set.insert(record))
    }
}
