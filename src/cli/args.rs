//! CLI argument parsing

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::consensus::GeoPoint;
use crate::detection::{Modality, Severity};

#[derive(Parser, Debug)]
#[command(name = "hazardfusion")]
#[command(version, about = "Classify hazard sounds and corroborate reports across sensors")]
pub struct Cli {
    /// Engine configuration file (JSON). Defaults to $HAZARDFUSION_CONFIG,
    /// then the user config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging, per-gate diagnostics)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify audio files (directories are searched recursively)
    Classify(ClassifyArgs),
    /// Try to form a cluster around a stored acoustic report
    Triangulate(ConsensusArgs),
    /// Look for cross-modal corroboration of a stored report
    Validate(ConsensusArgs),
    /// Add a photo/manual report to the store and run consensus on it
    Submit(SubmitArgs),
    /// List the hazard catalogue
    Profiles,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Input files or directories
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// JSON object of external classifier scores, {"class": score}
    #[arg(long)]
    pub scores: Option<PathBuf>,

    /// Latitude of the recording sensor
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the recording sensor
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Reporter trust score (0-10)
    #[arg(long, default_value_t = crate::classify::DEFAULT_TRUST)]
    pub trust: f32,

    /// Capture start time of every file (RFC 3339); defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub at: Option<DateTime<Utc>>,

    /// Persist detections to this JSON report store and run consensus
    #[arg(long)]
    pub store: Option<PathBuf>,
}

impl ClassifyArgs {
    pub fn location(&self) -> anyhow::Result<Option<GeoPoint>> {
        parse_location(self.lat, self.lon)
    }
}

#[derive(Args, Debug)]
pub struct ConsensusArgs {
    /// JSON report store
    #[arg(long)]
    pub store: PathBuf,

    /// Report id
    pub report: Uuid,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// JSON report store
    #[arg(long)]
    pub store: PathBuf,

    /// Intake path: photo, manual or acoustic
    #[arg(long, value_parser = parse_modality)]
    pub modality: Modality,

    /// Hazard label, e.g. "Gushing Water"
    #[arg(long)]
    pub label: String,

    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// low, medium, high or critical; defaults to the catalogue severity
    #[arg(long, value_parser = parse_severity)]
    pub severity: Option<Severity>,

    /// Report time (RFC 3339); defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub at: Option<DateTime<Utc>>,
}

impl SubmitArgs {
    pub fn location(&self) -> anyhow::Result<Option<GeoPoint>> {
        parse_location(self.lat, self.lon)
    }
}

/// Both coordinates or neither; a half-given or out-of-range pair is an error
fn parse_location(lat: Option<f64>, lon: Option<f64>) -> anyhow::Result<Option<GeoPoint>> {
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => GeoPoint::new(lat, lon)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("Invalid coordinates: {lat}, {lon}")),
        _ => anyhow::bail!("--lat and --lon must be given together"),
    }
}

fn parse_modality(s: &str) -> Result<Modality, String> {
    Modality::from_name(s).ok_or_else(|| format!("Unknown modality: {s}"))
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    Severity::from_name(s).ok_or_else(|| format!("Unknown severity: {s}"))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("Invalid RFC 3339 timestamp '{s}': {e}"))
}
