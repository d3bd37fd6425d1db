// src/classify/pipeline.rs
//
// Three-tier classification of analysis windows:
//   Preferred  external scores + fusion gates
//   Degraded   fusion without external scores
//   Heuristic  range matching when fusion rejects
// An insufficient-data sample short-circuits to a low, non-zero confidence.
//
// The worker thread reads windows from the capture session's channel, so the
// capture cadence never depends on classification latency.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

use super::external::{usable_scores, AcousticEventClassifier, ClassScores, Unavailable};
use super::fusion::FusionClassifier;
use super::heuristic::HeuristicClassifier;
use crate::config::{Catalogue, EngineConfig};
use crate::core::capture::{AnalysisWindow, CaptureSession};
use crate::core::frames::frame_signal;
use crate::core::AggregatedSample;
use crate::detection::Detection;
use crate::error::CaptureError;

/// Result of classifying one window
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ClassificationOutcome {
    Fused(Detection),
    Heuristic(Detection),
    NoHazard,
    InsufficientData { confidence: f32 },
}

impl ClassificationOutcome {
    pub fn detection(&self) -> Option<&Detection> {
        match self {
            ClassificationOutcome::Fused(d) | ClassificationOutcome::Heuristic(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_detection(self) -> Option<Detection> {
        match self {
            ClassificationOutcome::Fused(d) | ClassificationOutcome::Heuristic(d) => Some(d),
            _ => None,
        }
    }
}

/// Outcome tagged with the window it came from
#[derive(Debug, Clone, Serialize)]
pub struct WindowOutcome {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: ClassificationOutcome,
}

/// Everything one capture session produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub windows: Vec<WindowOutcome>,
    pub windows_dropped: usize,
}

impl SessionSummary {
    pub fn detections(&self) -> impl Iterator<Item = &Detection> {
        self.windows.iter().filter_map(|w| w.outcome.detection())
    }
}

pub struct ClassificationPipeline {
    fusion: FusionClassifier,
    heuristic: HeuristicClassifier,
    external: Arc<dyn AcousticEventClassifier>,
}

impl ClassificationPipeline {
    pub fn new(
        catalogue: Arc<Catalogue>,
        config: &EngineConfig,
        external: Arc<dyn AcousticEventClassifier>,
    ) -> Self {
        let heuristic =
            HeuristicClassifier::new(Arc::clone(&catalogue), config.fusion.heuristic_base_confidence);
        Self {
            fusion: FusionClassifier::new(catalogue, config.fusion.clone()),
            heuristic,
            external,
        }
    }

    /// Pipeline with no external classifier
    pub fn degraded(catalogue: Arc<Catalogue>, config: &EngineConfig) -> Self {
        Self::new(catalogue, config, Arc::new(Unavailable))
    }

    pub fn external_name(&self) -> &str {
        self.external.name()
    }

    pub fn classify_window(&self, window: &AnalysisWindow) -> ClassificationOutcome {
        if window.sample.is_insufficient() {
            return self.classify_sample(&window.sample, None);
        }
        let scores = usable_scores(self.external.classify(&window.samples, window.sample_rate));
        self.classify_sample(&window.sample, scores.as_ref())
    }

    /// Run the fallback chain on an already aggregated sample
    pub fn classify_sample(
        &self,
        sample: &AggregatedSample,
        scores: Option<&ClassScores>,
    ) -> ClassificationOutcome {
        if sample.is_insufficient() {
            return ClassificationOutcome::InsufficientData {
                confidence: sample.confidence,
            };
        }
        if let Some(detection) = self.fusion.classify(sample, scores) {
            return ClassificationOutcome::Fused(detection);
        }
        match self.heuristic.classify(sample) {
            Some(detection) => {
                debug!("fusion rejected window, heuristic matched {}", detection.hazard);
                ClassificationOutcome::Heuristic(detection)
            }
            None => ClassificationOutcome::NoHazard,
        }
    }

    /// Spawn the analysis worker. It clears `analyzing` after each window and
    /// returns all outcomes once the sending side hangs up.
    pub fn spawn(
        self: Arc<Self>,
        rx: Receiver<AnalysisWindow>,
        analyzing: Arc<AtomicBool>,
    ) -> JoinHandle<Vec<WindowOutcome>> {
        std::thread::spawn(move || {
            let mut outcomes = Vec::new();
            for window in rx {
                let outcome = self.classify_window(&window);
                outcomes.push(WindowOutcome {
                    window_start: window.sample.window_start,
                    window_end: window.sample.window_end,
                    outcome,
                });
                analyzing.store(false, Ordering::Release);
            }
            outcomes
        })
    }

    /// Capture a whole decoded signal through one session and classify every
    /// window on a worker thread.
    pub fn run_session(
        self: &Arc<Self>,
        config: &EngineConfig,
        samples: &[f32],
        sample_rate: u32,
        start: DateTime<Utc>,
    ) -> Result<SessionSummary, CaptureError> {
        let mut session =
            CaptureSession::new(config.capture.clone(), config.aggregator.clone(), sample_rate);
        let (tx, rx) = sync_channel(1);
        let worker = Arc::clone(self).spawn(rx, session.analyzing_flag());

        let frames = frame_signal(samples, sample_rate, config.capture.frame_size, start);
        let mut delivery = Ok(());
        for frame in frames {
            if let Some(window) = session.push_frame(frame) {
                if let Err(e) = session.dispatch(window, &tx) {
                    delivery = Err(e);
                    break;
                }
            }
        }
        if delivery.is_ok() {
            if let Some(window) = session.flush() {
                delivery = session.dispatch(window, &tx).map(|_| ());
            }
        }
        // Shorter than one frame: still report, as insufficient data
        if delivery.is_ok() && session.windows_sent() + session.windows_dropped() == 0 {
            let window = session.short_input_window(samples, start);
            delivery = session.dispatch(window, &tx).map(|_| ());
        }
        drop(tx);

        let windows = worker.join().map_err(|_| CaptureError::WorkerPanicked)?;
        delivery?;

        info!(
            "session finished: {} windows classified, {} dropped",
            windows.len(),
            session.windows_dropped()
        );
        Ok(SessionSummary {
            windows,
            windows_dropped: session.windows_dropped(),
        })
    }
}
