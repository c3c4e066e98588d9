//! # Pitch Estimation Module
//!
//! The tuner treats pitch estimation as an opaque function from a waveform window
//! to a frequency. [`PitchEstimator`] is that seam; any
//! `FnMut(&[f32]) -> Option<f32>` closure implements it, and [`McLeodEstimator`]
//! is the default backed by the `pitch-detection` crate.

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

use crate::config::PitchConfig;

/// Estimates the fundamental frequency of a waveform window.
pub trait PitchEstimator: Send {
    /// Returns the fundamental in Hz, or `None` if the window has no clear pitch.
    fn estimate(&mut self, samples: &[f32]) -> Option<f32>;
}

impl<F> PitchEstimator for F
where
    F: FnMut(&[f32]) -> Option<f32> + Send,
{
    fn estimate(&mut self, samples: &[f32]) -> Option<f32> {
        self(samples)
    }
}

/// McLeod pitch method estimator.
///
/// A detector sized to the incoming window is built on every call, so windows of
/// any length are accepted.
pub struct McLeodEstimator {
    sample_rate: usize,
    power_threshold: f32,
    clarity_threshold: f32,
}

impl McLeodEstimator {
    pub fn new(sample_rate: u32, config: &PitchConfig) -> Self {
        Self {
            sample_rate: sample_rate as usize,
            power_threshold: config.power_threshold,
            clarity_threshold: config.clarity_threshold,
        }
    }
}

impl PitchEstimator for McLeodEstimator {
    fn estimate(&mut self, samples: &[f32]) -> Option<f32> {
        if samples.len() < 2 {
            return None;
        }
        let window = samples.len();
        let mut detector = McLeodDetector::new(window, window / 2);
        let pitch = detector.get_pitch(
            samples,
            self.sample_rate,
            self.power_threshold,
            self.clarity_threshold,
        )?;

        // Only pass on valid, audible frequencies.
        if pitch.frequency.is_finite() && pitch.frequency > 20.0 {
            Some(pitch.frequency)
        } else {
            None
        }
    }
}
