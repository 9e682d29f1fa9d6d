//! Per-frame spectral feature extraction over an audio host

use super::{AudioConfig, AudioFeatureFrame, AudioHost, SpectrumAnalyzer, StreamHandle};
use crate::error::AudioError;

/// Pulls raw samples from an [`AudioHost`] once per frame and summarizes
/// them as an [`AudioFeatureFrame`].
///
/// The bin count is fixed at construction. Once stopped, the extractor does
/// not touch the host again and only hands out silent frames.
pub struct SpectralFeatureExtractor {
    host: Box<dyn AudioHost>,
    config: AudioConfig,
    analyzer: SpectrumAnalyzer,
    stream: Option<StreamHandle>,
    latest: AudioFeatureFrame,
}

impl SpectralFeatureExtractor {
    pub fn new(host: Box<dyn AudioHost>, config: AudioConfig) -> Result<Self, AudioError> {
        config.validate()?;
        let analyzer = SpectrumAnalyzer::new(&config);
        let latest = AudioFeatureFrame::silent(config.bin_count());

        Ok(Self {
            host,
            config,
            analyzer,
            stream: None,
            latest,
        })
    }

    pub fn bin_count(&self) -> usize {
        self.config.bin_count()
    }

    pub fn is_started(&self) -> bool {
        self.stream.is_some()
    }

    /// Start the signal and arm the transform. Starting twice returns the
    /// handle of the running stream.
    pub fn start(&mut self) -> Result<StreamHandle, AudioError> {
        if let Some(handle) = self.stream {
            return Ok(handle);
        }

        let handle = self.host.start_signal()?;
        self.analyzer.reset();
        self.latest = AudioFeatureFrame::silent(self.bin_count());
        self.stream = Some(handle);
        log::debug!(
            "Spectral extractor armed: stream {} at {} Hz",
            handle.id(),
            handle.sample_rate()
        );
        Ok(handle)
    }

    /// Release the signal. Unknown, stale and already-stopped handles are ignored.
    pub fn stop(&mut self, handle: StreamHandle) {
        if self.stream != Some(handle) {
            log::debug!("Ignoring stop for inactive stream {}", handle.id());
            return;
        }
        self.host.stop_signal(handle);
        self.stream = None;
        self.latest = AudioFeatureFrame::silent(self.bin_count());
    }

    /// Sample the host and return the newest features. When the host has
    /// nothing new the previous frame is repeated.
    pub fn get_frame(&mut self, handle: StreamHandle) -> AudioFeatureFrame {
        if self.stream != Some(handle) {
            return AudioFeatureFrame::silent(self.bin_count());
        }

        let fft_size = self.analyzer.fft_size();
        if let Some(samples) = self.host.sample_spectrum(handle, fft_size) {
            if samples.len() >= fft_size {
                let bins = self.analyzer.analyze(&samples);
                self.latest = AudioFeatureFrame::from_bins(bins, handle.sample_rate());
            }
        }

        self.latest.clone()
    }
}

impl Drop for SpectralFeatureExtractor {
    fn drop(&mut self) {
        if let Some(handle) = self.stream.take() {
            self.host.stop_signal(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{NullHost, SynthHost};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Host that counts calls and replays a fixed buffer
    #[derive(Default)]
    struct CountingHost {
        calls: Rc<RefCell<(usize, usize, usize)>>,
        samples: Vec<f32>,
    }

    impl AudioHost for CountingHost {
        fn start_signal(&mut self) -> Result<StreamHandle, AudioError> {
            self.calls.borrow_mut().0 += 1;
            Ok(StreamHandle::new(1, 48000))
        }

        fn stop_signal(&mut self, _handle: StreamHandle) {
            self.calls.borrow_mut().1 += 1;
        }

        fn sample_spectrum(&mut self, _handle: StreamHandle, _len: usize) -> Option<Vec<f32>> {
            self.calls.borrow_mut().2 += 1;
            Some(self.samples.clone())
        }
    }

    #[test]
    fn start_twice_returns_same_handle_and_starts_host_once() {
        let calls = Rc::new(RefCell::new((0, 0, 0)));
        let host = CountingHost {
            calls: calls.clone(),
            samples: vec![0.0; 256],
        };
        let mut extractor =
            SpectralFeatureExtractor::new(Box::new(host), AudioConfig::default()).unwrap();

        let a = extractor.start().unwrap();
        let b = extractor.start().unwrap();

        assert_eq!(a, b);
        assert_eq!(calls.borrow().0, 1);
    }

    #[test]
    fn stop_is_idempotent_and_halts_sampling() {
        let calls = Rc::new(RefCell::new((0, 0, 0)));
        let host = CountingHost {
            calls: calls.clone(),
            samples: vec![0.0; 256],
        };
        let mut extractor =
            SpectralFeatureExtractor::new(Box::new(host), AudioConfig::default()).unwrap();
        let handle = extractor.start().unwrap();

        extractor.get_frame(handle);
        extractor.stop(handle);
        extractor.stop(handle);
        let frame = extractor.get_frame(handle);

        assert_eq!(*calls.borrow(), (1, 1, 1));
        assert!(frame.is_silent());
        assert_eq!(frame.bins.len(), 128);
    }

    #[test]
    fn stop_on_never_started_extractor_is_a_no_op() {
        let mut extractor =
            SpectralFeatureExtractor::new(Box::new(NullHost), AudioConfig::default()).unwrap();

        extractor.stop(StreamHandle::new(42, 48000));

        assert!(!extractor.is_started());
    }

    #[test]
    fn unavailable_audio_reports_error() {
        let mut extractor =
            SpectralFeatureExtractor::new(Box::new(NullHost), AudioConfig::default()).unwrap();

        assert_eq!(extractor.start(), Err(AudioError::Disabled));
        assert!(!extractor.is_started());
    }

    #[test]
    fn silent_signal_gives_zero_features() {
        let host = CountingHost {
            calls: Rc::default(),
            samples: vec![0.0; 256],
        };
        let mut extractor =
            SpectralFeatureExtractor::new(Box::new(host), AudioConfig::default()).unwrap();
        let handle = extractor.start().unwrap();

        let frame = extractor.get_frame(handle);

        assert_eq!(frame.amplitude, 0.0);
        assert_eq!(frame.dominant_frequency, 0.0);
    }

    #[test]
    fn synth_signal_produces_bounded_features_with_constant_bin_count() {
        let config = AudioConfig::default();
        let nyquist = config.sample_rate as f32 / 2.0;
        let mut extractor =
            SpectralFeatureExtractor::new(Box::new(SynthHost::new(config.clone())), config)
                .unwrap();
        let handle = extractor.start().unwrap();

        for _ in 0..30 {
            let frame = extractor.get_frame(handle);
            assert_eq!(frame.bins.len(), 128);
            assert!(frame.amplitude >= 0.0 && frame.amplitude <= 1.0);
            assert!(frame.dominant_frequency >= 0.0 && frame.dominant_frequency <= nyquist);
        }

        let frame = extractor.get_frame(handle);
        assert!(frame.amplitude > 0.0);
    }
}
