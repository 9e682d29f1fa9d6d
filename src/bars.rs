//! Spectrum bar levels for the draw list

use crate::audio::AudioFeatureFrame;

/// Per-frame decay applied while no audio is flowing
pub const IDLE_DECAY: f32 = 0.95;

/// Bar heights (0-1) that follow the spectrum while audio is live and fall
/// away smoothly when it stops.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumBars {
    levels: Vec<f32>,
}

impl SpectrumBars {
    pub fn new(count: usize) -> Self {
        Self {
            levels: vec![0.0; count],
        }
    }

    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    pub fn resize(&mut self, count: usize) {
        self.levels.resize(count, 0.0);
    }

    /// Copy the leading bins when `live`, otherwise decay toward zero
    pub fn update(&mut self, features: &AudioFeatureFrame, live: bool) {
        if live {
            for (level, bin) in self.levels.iter_mut().zip(features.bins.iter()) {
                *level = bin.abs().min(1.0);
            }
        } else {
            for level in self.levels.iter_mut() {
                *level *= IDLE_DECAY;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_audio_sets_levels_from_bins() {
        let mut bars = SpectrumBars::new(3);
        let frame = AudioFeatureFrame::from_bins(vec![0.2, 0.4, 0.6, 0.8], 48000);

        bars.update(&frame, true);

        assert_eq!(bars.levels(), &[0.2, 0.4, 0.6]);
    }

    #[test]
    fn idle_levels_decay() {
        let mut bars = SpectrumBars::new(2);
        bars.update(&AudioFeatureFrame::from_bins(vec![1.0, 0.5], 48000), true);

        bars.update(&AudioFeatureFrame::silent(2), false);

        assert!((bars.levels()[0] - 0.95).abs() < 1e-6);
        assert!((bars.levels()[1] - 0.475).abs() < 1e-6);
    }
}
