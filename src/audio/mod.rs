//! Audio signal sources and spectral feature extraction

mod capture;
mod extractor;
mod sources;
mod spectrum;
mod synth;

pub use capture::{AudioBuffer, CaptureHost};
pub use extractor::SpectralFeatureExtractor;
pub use sources::{list_sources, AudioSource, SourceType};
pub use spectrum::SpectrumAnalyzer;
pub use synth::{SynthHost, SynthVoice};

use crate::error::AudioError;
use serde::{Deserialize, Serialize};

/// Audio processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz (capture hosts replace this with the device rate)
    pub sample_rate: u32,

    /// FFT window size, power of two
    pub fft_size: usize,

    /// Host frame rate the signal is sampled at
    pub frame_rate: f32,

    /// Magnitude mapped to 0.0
    pub min_decibels: f32,

    /// Magnitude mapped to 1.0
    pub max_decibels: f32,

    /// Exponential smoothing between frames (0 = none, <1)
    pub smoothing: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            fft_size: 256,
            frame_rate: 60.0,
            min_decibels: -100.0,
            max_decibels: -30.0,
            smoothing: 0.8,
        }
    }
}

impl AudioConfig {
    /// Number of frequency bins produced per frame
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Samples that elapse during one host frame
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as f32 / self.frame_rate).round().max(1.0) as usize
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(AudioError::Config(format!(
                "fft_size must be a power of two >= 2, got {}",
                self.fft_size
            )));
        }
        if self.sample_rate == 0 {
            return Err(AudioError::Config("sample_rate must be positive".to_string()));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(AudioError::Config(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !(self.min_decibels < self.max_decibels) {
            return Err(AudioError::Config(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(AudioError::Config(format!(
                "smoothing must be within [0, 1), got {}",
                self.smoothing
            )));
        }
        Ok(())
    }
}

/// Identifies one started signal on an [`AudioHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle {
    id: u64,
    sample_rate: u32,
}

impl StreamHandle {
    pub fn new(id: u64, sample_rate: u32) -> Self {
        Self { id, sample_rate }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Sample rate the signal is actually running at
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Provider of a raw time-domain signal.
///
/// Hosts own the underlying device or generator; the extractor only ever
/// asks them for the most recent `len` samples of a started signal.
pub trait AudioHost {
    /// Begin generating or capturing a signal
    fn start_signal(&mut self) -> Result<StreamHandle, AudioError>;

    /// Release the signal. Unknown or already-stopped handles are ignored.
    fn stop_signal(&mut self, handle: StreamHandle);

    /// Copy out the latest `len` mono samples, oldest first
    fn sample_spectrum(&mut self, handle: StreamHandle, len: usize) -> Option<Vec<f32>>;
}

/// Audio host used when audio is switched off; never starts.
#[derive(Debug, Default)]
pub struct NullHost;

impl AudioHost for NullHost {
    fn start_signal(&mut self) -> Result<StreamHandle, AudioError> {
        Err(AudioError::Disabled)
    }

    fn stop_signal(&mut self, _handle: StreamHandle) {}

    fn sample_spectrum(&mut self, _handle: StreamHandle, _len: usize) -> Option<Vec<f32>> {
        None
    }
}

/// Per-frame spectral summary handed to the particle engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioFeatureFrame {
    /// Mean normalized bin magnitude (0-1)
    pub amplitude: f32,

    /// Spectral centroid in Hz (0 to sample_rate / 2)
    pub dominant_frequency: f32,

    /// Normalized per-bin magnitudes
    pub bins: Vec<f32>,
}

impl AudioFeatureFrame {
    /// Zero-valued frame used whenever audio is stopped or unavailable
    pub fn silent(bin_count: usize) -> Self {
        Self {
            amplitude: 0.0,
            dominant_frequency: 0.0,
            bins: vec![0.0; bin_count],
        }
    }

    /// Summarize normalized bins. Bin `i` is centred at
    /// `i / bin_count * sample_rate / 2`.
    pub fn from_bins(mut bins: Vec<f32>, sample_rate: u32) -> Self {
        for bin in bins.iter_mut() {
            *bin = if bin.is_finite() { bin.clamp(0.0, 1.0) } else { 0.0 };
        }
        if bins.is_empty() {
            return Self::silent(0);
        }

        let count = bins.len() as f32;
        let nyquist = sample_rate as f32 / 2.0;

        let total: f32 = bins.iter().sum();
        let weighted: f32 = bins
            .iter()
            .enumerate()
            .map(|(i, &b)| b * (i as f32 / count) * nyquist)
            .sum();

        let amplitude = (total / count).clamp(0.0, 1.0);
        let dominant_frequency = if total > 0.0 {
            (weighted / total).clamp(0.0, nyquist)
        } else {
            0.0
        };

        Self {
            amplitude,
            dominant_frequency,
            bins,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.amplitude == 0.0
    }
}
