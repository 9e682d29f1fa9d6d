//! Synthetic signal generator
//!
//! A sine carrier frequency-modulated by a slow LFO. It needs no audio
//! device, so it doubles as the deterministic source for tests.

use super::{AudioBuffer, AudioConfig, AudioHost, StreamHandle};
use crate::error::AudioError;
use std::f64::consts::TAU;

/// One running oscillator pair
pub struct SynthVoice {
    /// Carrier frequency (Hz)
    pub carrier_hz: f64,
    /// LFO rate (Hz)
    pub lfo_hz: f64,
    /// Carrier deviation at full LFO swing (Hz)
    pub lfo_depth_hz: f64,
    /// Output gain
    pub gain: f64,

    sample_rate: f64,
    phase: f64,
    time: f64,
}

impl SynthVoice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            carrier_hz: 220.0,
            lfo_hz: 0.5,
            lfo_depth_hz: 50.0,
            gain: 0.1,
            sample_rate: sample_rate as f64,
            phase: 0.0,
            time: 0.0,
        }
    }

    /// Instantaneous carrier frequency at the current time
    pub fn current_frequency(&self) -> f64 {
        self.carrier_hz + self.lfo_depth_hz * (TAU * self.lfo_hz * self.time).sin()
    }

    /// Render the next `count` samples
    pub fn render(&mut self, count: usize) -> Vec<f32> {
        let dt = 1.0 / self.sample_rate;
        (0..count)
            .map(|_| {
                self.phase = (self.phase + TAU * self.current_frequency() * dt) % TAU;
                self.time += dt;
                (self.gain * self.phase.sin()) as f32
            })
            .collect()
    }

    /// Seconds of signal rendered so far
    pub fn elapsed(&self) -> f64 {
        self.time
    }
}

struct ActiveVoice {
    handle: StreamHandle,
    voice: SynthVoice,
    buffer: AudioBuffer,
}

/// Audio host producing the synthetic signal.
///
/// Every `sample_spectrum` call advances the voice by one host frame, so the
/// signal moves at the frame rate of whoever pulls it.
pub struct SynthHost {
    config: AudioConfig,
    next_id: u64,
    active: Option<ActiveVoice>,
}

impl SynthHost {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            next_id: 1,
            active: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// Seconds of signal produced by the running voice
    pub fn elapsed(&self) -> Option<f64> {
        self.active.as_ref().map(|a| a.voice.elapsed())
    }
}

impl AudioHost for SynthHost {
    fn start_signal(&mut self) -> Result<StreamHandle, AudioError> {
        if let Some(active) = &self.active {
            return Ok(active.handle);
        }
        self.config.validate()?;

        let handle = StreamHandle::new(self.next_id, self.config.sample_rate);
        self.next_id += 1;

        let mut voice = SynthVoice::new(self.config.sample_rate);
        let capacity = self.config.fft_size.max(self.config.samples_per_frame()) * 2;
        let mut buffer = AudioBuffer::new(capacity);
        // Prime one analysis window so the first frame is not half silence
        buffer.push_samples(&voice.render(self.config.fft_size));

        self.active = Some(ActiveVoice {
            handle,
            voice,
            buffer,
        });
        log::info!(
            "Synth signal started ({} Hz, {}-point FFT)",
            self.config.sample_rate,
            self.config.fft_size
        );
        Ok(handle)
    }

    fn stop_signal(&mut self, handle: StreamHandle) {
        if self.active.as_ref().map(|a| a.handle) == Some(handle) {
            self.active = None;
            log::info!("Synth signal stopped");
        }
    }

    fn sample_spectrum(&mut self, handle: StreamHandle, len: usize) -> Option<Vec<f32>> {
        let per_frame = self.config.samples_per_frame();
        let active = self.active.as_mut().filter(|a| a.handle == handle)?;

        let fresh = active.voice.render(per_frame);
        active.buffer.push_samples(&fresh);
        Some(active.buffer.get_latest(len))
    }
}
