//! Error types for hazardfusion
//!
//! Classification and consensus outcomes are ordinary values. The types here
//! cover the failures a caller has to handle: the report store and the
//! configuration layer.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Failures of the persisted report store.
///
/// This is the only error category triangulation and validation surface.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("report {0} not found in store")]
    NotFound(Uuid),

    #[error("report store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("report store contents are malformed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("report store lock was poisoned by a panicking writer")]
    Poisoned,

    #[error("timed out waiting for store lock {}", .0.display())]
    LockTimeout(PathBuf),
}

/// Failures while loading or validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the capture loop itself (not of classification)
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("analysis worker stopped before the window could be delivered")]
    WorkerDisconnected,

    #[error("analysis worker panicked")]
    WorkerPanicked,
}
