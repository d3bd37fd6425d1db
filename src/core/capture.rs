// src/core/capture.rs
//
// Capture session: buffers frames into fixed wall-clock collection windows
// and hands each completed window to an analysis worker over a bounded
// channel, so capture never waits on classification unless asked to.
//
// All per-session state (buffer, window start, phase flag) lives in the
// session object. Several sessions can run side by side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::aggregator::{AggregatedSample, FeatureAggregator};
use super::frames::AudioFrame;
use crate::config::{AggregatorConfig, Backpressure, CaptureConfig};
use crate::error::CaptureError;

/// What a session is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Collecting,
    Analyzing,
}

/// One completed collection window, ready for classification
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    pub sample: AggregatedSample,
    /// Raw samples of the window, for the external classifier
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

pub struct CaptureSession {
    config: CaptureConfig,
    aggregator: FeatureAggregator,
    sample_rate: u32,
    frames: Vec<AudioFrame>,
    window_start: Option<DateTime<Utc>>,
    analyzing: Arc<AtomicBool>,
    windows_sent: usize,
    windows_dropped: usize,
}

impl CaptureSession {
    pub fn new(config: CaptureConfig, aggregator: AggregatorConfig, sample_rate: u32) -> Self {
        let aggregator = FeatureAggregator::new(aggregator, sample_rate, config.frame_size);
        Self {
            config,
            aggregator,
            sample_rate,
            frames: Vec::new(),
            window_start: None,
            analyzing: Arc::new(AtomicBool::new(false)),
            windows_sent: 0,
            windows_dropped: 0,
        }
    }

    /// Flag shared with the analysis worker; it clears it when a window is done
    pub fn analyzing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.analyzing)
    }

    pub fn phase(&self) -> CapturePhase {
        if self.analyzing.load(Ordering::Acquire) {
            CapturePhase::Analyzing
        } else if !self.frames.is_empty() {
            CapturePhase::Collecting
        } else {
            CapturePhase::Idle
        }
    }

    pub fn windows_sent(&self) -> usize {
        self.windows_sent
    }

    pub fn windows_dropped(&self) -> usize {
        self.windows_dropped
    }

    /// Buffer a frame; returns the window it completes, if any
    pub fn push_frame(&mut self, frame: AudioFrame) -> Option<AnalysisWindow> {
        let start = *self.window_start.get_or_insert(frame.captured_at);
        let frame_us = frame.samples.len() as i64 * 1_000_000 / self.sample_rate.max(1) as i64;
        let elapsed_us = (frame.captured_at - start).num_microseconds().unwrap_or(i64::MAX);
        self.frames.push(frame);

        let window_us = (self.config.window_secs * 1_000_000.0) as i64;
        if elapsed_us.saturating_add(frame_us) >= window_us
            || self.frames.len() >= self.config.max_frames_per_window
        {
            return self.close_window();
        }
        None
    }

    /// Close the partially filled window, e.g. at end of input
    pub fn flush(&mut self) -> Option<AnalysisWindow> {
        self.close_window()
    }

    fn close_window(&mut self) -> Option<AnalysisWindow> {
        self.window_start = None;
        if self.frames.is_empty() {
            return None;
        }
        let frames = std::mem::take(&mut self.frames);
        let sample = self.aggregator.aggregate(&frames);
        let samples = frames.into_iter().flat_map(|f| f.samples).collect();
        debug!(
            "window closed: {}/{} active frames, rms {:.4}",
            sample.active_frames, sample.total_frames, sample.rms_level
        );
        Some(AnalysisWindow {
            sample,
            samples,
            sample_rate: self.sample_rate,
        })
    }

    /// Window for input too short to fill one frame. It carries no frames, so
    /// it aggregates to an insufficient-data sample.
    pub fn short_input_window(&mut self, samples: &[f32], at: DateTime<Utc>) -> AnalysisWindow {
        let mut sample = self.aggregator.aggregate(&[]);
        let duration_us = samples.len() as i64 * 1_000_000 / self.sample_rate.max(1) as i64;
        sample.captured_at = at;
        sample.window_start = at;
        sample.window_end = at + chrono::Duration::microseconds(duration_us);
        AnalysisWindow {
            sample,
            samples: samples.to_vec(),
            sample_rate: self.sample_rate,
        }
    }

    /// Hand a window to the worker according to the backpressure policy.
    ///
    /// Returns `Ok(false)` when the window was dropped.
    pub fn dispatch(
        &mut self,
        window: AnalysisWindow,
        tx: &SyncSender<AnalysisWindow>,
    ) -> Result<bool, CaptureError> {
        match self.config.backpressure {
            Backpressure::Block => {
                self.analyzing.store(true, Ordering::Release);
                tx.send(window).map_err(|_| CaptureError::WorkerDisconnected)?;
                self.windows_sent += 1;
                Ok(true)
            }
            Backpressure::DropWhileAnalyzing => {
                if self.analyzing.swap(true, Ordering::AcqRel) {
                    self.drop_window();
                    return Ok(false);
                }
                match tx.try_send(window) {
                    Ok(()) => {
                        self.windows_sent += 1;
                        Ok(true)
                    }
                    Err(TrySendError::Full(_)) => {
                        self.drop_window();
                        Ok(false)
                    }
                    Err(TrySendError::Disconnected(_)) => Err(CaptureError::WorkerDisconnected),
                }
            }
        }
    }

    fn drop_window(&mut self) {
        self.windows_dropped += 1;
        warn!(
            "analysis still running, dropped window ({} so far)",
            self.windows_dropped
        );
    }
}
