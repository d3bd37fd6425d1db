// src/cli/commands.rs
//
// Subcommand implementations. Each returns plain data; printing lives in
// output.rs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;
use walkdir::WalkDir;

use super::args::{ClassifyArgs, SubmitArgs};
use crate::classify::{
    AcousticEventClassifier, Calibrator, ClassificationPipeline, SessionSummary, StaticScores,
    Unavailable,
};
use crate::config::{Catalogue, EngineConfig};
use crate::consensus::{
    CrossModalValidator, GeoPoint, JsonFileReportStore, ReportStore, TriangulationOutcome,
    Triangulator, ValidationOutcome,
};
use crate::core::decoder::{decode_audio, is_audio_file};
use crate::detection::{Detection, Modality, Report, Severity};

/// Classification of one input file
#[derive(Debug, Serialize)]
pub struct FileResult {
    pub path: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub summary: SessionSummary,
    /// Calibrated, located detections ready to persist
    pub detections: Vec<Detection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    /// The strongest detection per hazard. A recording is a single witness,
    /// so its windows are not persisted as separate reports.
    pub fn witness_detections(&self) -> Vec<&Detection> {
        let mut best: Vec<&Detection> = Vec::new();
        for detection in &self.detections {
            match best.iter_mut().find(|d| d.hazard == detection.hazard) {
                Some(slot) if detection.confidence > slot.confidence => *slot = detection,
                Some(_) => {}
                None => best.push(detection),
            }
        }
        best
    }
}

/// Consensus passes run on one persisted report
#[derive(Debug, Serialize)]
pub struct ConsensusResult {
    pub report: Report,
    pub triangulation: Option<TriangulationOutcome>,
    pub validation: ValidationOutcome,
}

/// Expand directories into the audio files below them
pub fn collect_audio_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            if is_audio_file(path) {
                files.push(path.clone());
            } else {
                warn!("skipping non-audio file {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && is_audio_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            warn!("{} does not exist", path.display());
        }
    }
    files.sort();
    files
}

pub fn classify(
    args: &ClassifyArgs,
    config: &EngineConfig,
    catalogue: Arc<Catalogue>,
    show_progress: bool,
) -> Result<(Vec<FileResult>, Vec<ConsensusResult>)> {
    let files = collect_audio_files(&args.paths);
    if files.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let external: Arc<dyn AcousticEventClassifier> = match &args.scores {
        Some(path) => Arc::new(StaticScores::from_json_file(path)?),
        None => Arc::new(Unavailable),
    };
    let pipeline = Arc::new(ClassificationPipeline::new(catalogue, config, external));
    info!(
        "classifying {} file(s), external classifier: {}",
        files.len(),
        pipeline.external_name()
    );

    let location = args.location()?;
    let start = args.at.unwrap_or_else(Utc::now);

    let progress = if show_progress {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("=> "),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    // One capture session per file; files are independent sensors
    let results: Vec<FileResult> = files
        .par_iter()
        .progress_with(progress.clone())
        .map(|path| classify_file(path, &pipeline, config, start, location, args.trust))
        .collect();
    progress.finish_and_clear();

    let consensus = match &args.store {
        Some(store_path) => persist_and_corroborate(store_path, &results, config)?,
        None => Vec::new(),
    };
    Ok((results, consensus))
}

/// Decode, capture and classify one file. Decode failures are recorded on
/// the result so one bad file does not abort a batch.
pub fn classify_file(
    path: &Path,
    pipeline: &Arc<ClassificationPipeline>,
    config: &EngineConfig,
    start: DateTime<Utc>,
    location: Option<GeoPoint>,
    trust: f32,
) -> FileResult {
    let mut result = FileResult {
        path: path.display().to_string(),
        duration_secs: 0.0,
        sample_rate: 0,
        summary: SessionSummary::default(),
        detections: Vec::new(),
        error: None,
    };

    let audio = match decode_audio(path) {
        Ok(audio) => audio,
        Err(e) => {
            warn!("{}: {e:#}", path.display());
            result.error = Some(format!("{e:#}"));
            return result;
        }
    };
    result.duration_secs = audio.duration_secs;
    result.sample_rate = audio.sample_rate;

    match pipeline.run_session(config, &audio.samples, audio.sample_rate, start) {
        Ok(summary) => {
            let calibrator = Calibrator::new();
            result.detections = summary
                .detections()
                .cloned()
                .map(|mut d| {
                    calibrator.apply(&mut d, trust);
                    d.with_location(location)
                })
                .collect();
            result.summary = summary;
        }
        Err(e) => result.error = Some(e.to_string()),
    }
    result
}

fn persist_and_corroborate(
    store_path: &Path,
    results: &[FileResult],
    config: &EngineConfig,
) -> Result<Vec<ConsensusResult>> {
    let store = JsonFileReportStore::open(store_path);
    let mut consensus = Vec::new();
    for result in results {
        for detection in result.witness_detections() {
            let report = Report::from_detection(detection.clone()).with_source(result.path.clone());
            let id = store
                .insert(report)
                .with_context(|| format!("Failed to persist detection to {}", store_path.display()))?;
            consensus.push(run_consensus(&store, id, config)?);
        }
    }
    Ok(consensus)
}

/// Triangulate (acoustic reports only) then validate a persisted report
pub fn run_consensus<S: ReportStore>(
    store: &S,
    id: Uuid,
    config: &EngineConfig,
) -> Result<ConsensusResult> {
    let triangulator = Triangulator::new(config.triangulation.clone());
    let validator = CrossModalValidator::new(config.validation.clone());

    let report = store.get(id)?.with_context(|| format!("Report {id} not found"))?;
    let triangulation = if report.modality == Modality::Acoustic {
        Some(triangulator.triangulate(store, id)?)
    } else {
        None
    };
    let validation = validator.validate(store, id)?;
    let report = store.get(id)?.with_context(|| format!("Report {id} not found"))?;

    Ok(ConsensusResult {
        report,
        triangulation,
        validation,
    })
}

pub fn triangulate(store_path: &Path, id: Uuid, config: &EngineConfig) -> Result<TriangulationOutcome> {
    let store = JsonFileReportStore::open(store_path);
    Ok(Triangulator::new(config.triangulation.clone()).triangulate(&store, id)?)
}

pub fn validate(store_path: &Path, id: Uuid, config: &EngineConfig) -> Result<ValidationOutcome> {
    let store = JsonFileReportStore::open(store_path);
    Ok(CrossModalValidator::new(config.validation.clone()).validate(&store, id)?)
}

pub fn submit(args: &SubmitArgs, config: &EngineConfig, catalogue: &Catalogue) -> Result<ConsensusResult> {
    let severity = args.severity.unwrap_or_else(|| default_severity(catalogue, &args.label));
    let report = Report::external(
        args.modality,
        args.label.clone(),
        severity,
        args.location()?,
        args.at.unwrap_or_else(Utc::now),
    );

    let store = JsonFileReportStore::open(&args.store);
    let id = store
        .insert(report)
        .with_context(|| format!("Failed to persist report to {}", args.store.display()))?;
    info!("stored {} report {id}", args.modality.name());
    run_consensus(&store, id, config)
}

/// Catalogue severity for a hazard label, Medium for unknown labels
fn default_severity(catalogue: &Catalogue, label: &str) -> Severity {
    catalogue
        .profiles()
        .iter()
        .find(|p| p.kind.label().eq_ignore_ascii_case(label) || p.kind.name() == label)
        .map(|p| p.default_severity)
        .unwrap_or(Severity::Medium)
}
