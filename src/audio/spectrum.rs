//! Fixed-size FFT magnitude analysis

use super::AudioConfig;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Turns a block of time-domain samples into normalized bin magnitudes.
///
/// Each frame is Blackman-windowed, transformed, smoothed against the
/// previous frame and mapped from `[min_decibels, max_decibels]` onto `[0, 1]`.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,

    // Smoothed linear magnitudes, one per bin
    smoothed: Vec<f32>,

    min_decibels: f32,
    max_decibels: f32,
    smoothing: f32,
}

impl SpectrumAnalyzer {
    pub fn new(config: &AudioConfig) -> Self {
        let fft_size = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            window: blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            smoothing: config.smoothing,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyze the first `fft_size` samples. Short input yields silent bins
    /// and leaves the smoothing state untouched.
    pub fn analyze(&mut self, samples: &[f32]) -> Vec<f32> {
        if samples.len() < self.fft_size {
            return vec![0.0; self.bin_count()];
        }

        for ((slot, &sample), &w) in self
            .buffer
            .iter_mut()
            .zip(samples.iter())
            .zip(self.window.iter())
        {
            // Device glitches can deliver NaN or inf; treat them as silence
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let smoothing = self.smoothing;
        let min_decibels = self.min_decibels;
        let range = self.max_decibels - self.min_decibels;

        self.smoothed
            .iter_mut()
            .zip(self.buffer.iter())
            .map(|(smoothed, c)| {
                let magnitude = c.norm() * scale;
                let magnitude = if magnitude.is_finite() { magnitude } else { 0.0 };
                *smoothed = smoothing * *smoothed + (1.0 - smoothing) * magnitude;
                if !smoothed.is_finite() {
                    *smoothed = 0.0;
                }

                if *smoothed <= 0.0 {
                    return 0.0;
                }
                let db = 20.0 * smoothed.log10();
                ((db - min_decibels) / range).clamp(0.0, 1.0)
            })
            .collect()
    }

    /// Forget smoothing history
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
    }
}

/// Blackman window over `size` samples
pub fn blackman_window(size: usize) -> Vec<f32> {
    use std::f32::consts::PI;

    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = i as f32 / n;
            0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
        })
        .collect()
}
