#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use hazardfusion::{GeoPoint, Modality, Report, Severity};

pub const SAMPLE_RATE: u32 = 16000;

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hazardfusion"))
}

pub fn run_hazardfusion() -> Command {
    let mut cmd = Command::new(get_binary_path());
    // Keep output deterministic regardless of the caller's environment
    cmd.env_remove("RUST_LOG").env("HAZARDFUSION_CONFIG", "");
    cmd
}

/// Deterministic white noise in [-amplitude, amplitude]
pub fn white_noise(len: usize, amplitude: f32) -> Vec<f32> {
    let mut state = 0x9e37_79b9_u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            amplitude * ((state as f32 / u32::MAX as f32) * 2.0 - 1.0)
        })
        .collect()
}

pub fn sine(len: usize, freq: f32, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

/// Write mono 16-bit PCM
pub fn write_wav(path: &Path, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

pub fn acoustic_report(label: &str, lat: f64, lon: f64, rms: f32, at: DateTime<Utc>) -> Report {
    let mut report = Report::external(
        Modality::Acoustic,
        label,
        Severity::High,
        GeoPoint::new(lat, lon),
        at,
    );
    report.rms_level = rms;
    report.confidence = 0.7;
    report
}

/// Point `meters_north` / `meters_east` away from `origin`
pub fn offset(origin: GeoPoint, meters_north: f64, meters_east: f64) -> GeoPoint {
    let dlat = meters_north / 111_195.0;
    let dlon = meters_east / (111_195.0 * origin.latitude.to_radians().cos());
    GeoPoint::new(origin.latitude + dlat, origin.longitude + dlon).unwrap()
}
