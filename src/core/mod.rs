//! Signal side of the engine: decoding, framing, capture windows and
//! feature aggregation

pub mod aggregator;
pub mod capture;
pub mod decoder;
pub mod dsp;
pub mod frames;

pub use aggregator::{AggregatedSample, FeatureAggregator, SampleQuality};
pub use capture::{AnalysisWindow, CapturePhase, CaptureSession};
pub use decoder::{decode_audio, AudioData};
pub use dsp::SpectralAnalyzer;
pub use frames::{frame_signal, AudioFrame};
