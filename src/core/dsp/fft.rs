//! FFT processing with windowing

use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::windows::{create_window, WindowType};

/// Windowed forward FFT of a fixed size, planned once and reused per frame
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    fft_size: usize,
    scratch: Vec<Complex<f32>>,
}

impl FftProcessor {
    pub fn new(fft_size: usize, window_type: WindowType) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(fft_size),
            window: create_window(fft_size, window_type),
            fft_size,
            scratch: Vec::with_capacity(fft_size),
        }
    }

    /// Magnitude spectrum of the first `fft_size` samples (zero-padded),
    /// positive frequencies only: `fft_size / 2` bins.
    pub fn magnitude_spectrum(&mut self, samples: &[f32]) -> Vec<f32> {
        self.scratch.clear();
        self.scratch.extend(
            samples
                .iter()
                .take(self.fft_size)
                .zip(&self.window)
                .map(|(&s, &w)| Complex::new(s * w, 0.0)),
        );
        self.scratch.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut self.scratch);

        self.scratch[..self.fft_size / 2]
            .iter()
            .map(|c| c.norm())
            .collect()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}
