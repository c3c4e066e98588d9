//! # Configuration Module
//!
//! Construction-time settings for the analysis source, the poller and the pitch
//! estimator. Every struct deserialises from JSON with missing fields filled from
//! the defaults, so a config file only needs to name what it changes:
//!
//! ```json
//! { "listener": { "poll_interval_ms": 30 }, "analyzer": { "fft_size": 4096 } }
//! ```
//!
//! Settings are immutable once a listener or tuner has been built from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TunerError};

/// Default linear amplitude a time-domain buffer must exceed to be published.
pub const DEFAULT_GAIN_THRESHOLD: f32 = 0.01;
/// Default poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
/// Default McLeod power threshold.
pub const DEFAULT_POWER_THRESHOLD: f32 = 0.1;
/// Default McLeod clarity threshold.
pub const DEFAULT_CLARITY_THRESHOLD: f32 = 0.7;

/// Analysis window size. Only powers of two from 32 to 32768 are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FftSize(u32);

impl FftSize {
    pub const MIN: FftSize = FftSize(32);
    pub const MAX: FftSize = FftSize(32768);

    /// Number of samples in one analysis window.
    pub fn samples(self) -> usize {
        self.0 as usize
    }

    /// Number of frequency bins, half the window.
    pub fn bin_count(self) -> usize {
        self.samples() / 2
    }
}

impl Default for FftSize {
    fn default() -> Self {
        FftSize(2048)
    }
}

impl TryFrom<u32> for FftSize {
    type Error = TunerError;

    fn try_from(value: u32) -> Result<Self> {
        if value.is_power_of_two() && (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(FftSize(value))
        } else {
            Err(TunerError::InvalidConfig(format!(
                "fft size {value} must be a power of two between {} and {}",
                Self::MIN.0,
                Self::MAX.0
            )))
        }
    }
}

impl From<FftSize> for u32 {
    fn from(size: FftSize) -> u32 {
        size.0
    }
}

impl fmt::Display for FftSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings for the audio analysis source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub fft_size: FftSize,
}

/// Settings for the [`AnalyserListener`](crate::listener::AnalyserListener) poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Minimum linear amplitude (0.0 to 1.0) for a time-domain buffer to count as signal.
    pub gain_threshold: f32,
    /// Milliseconds between polls.
    pub poll_interval_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            gain_threshold: DEFAULT_GAIN_THRESHOLD,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ListenerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(TunerError::InvalidConfig(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if !self.gain_threshold.is_finite() || self.gain_threshold < 0.0 {
            return Err(TunerError::InvalidConfig(format!(
                "gain_threshold {} must be a finite, non-negative amplitude",
                self.gain_threshold
            )));
        }
        Ok(())
    }
}

/// Thresholds handed to the default McLeod pitch estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub power_threshold: f32,
    /// Normalised peak height (0.0 to 1.0) below which a window is treated as unpitched.
    pub clarity_threshold: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            power_threshold: DEFAULT_POWER_THRESHOLD,
            clarity_threshold: DEFAULT_CLARITY_THRESHOLD,
        }
    }
}

impl PitchConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.power_threshold.is_finite() || self.power_threshold < 0.0 {
            return Err(TunerError::InvalidConfig(format!(
                "power_threshold {} must be finite and non-negative",
                self.power_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.clarity_threshold) {
            return Err(TunerError::InvalidConfig(format!(
                "clarity_threshold {} must lie between 0 and 1",
                self.clarity_threshold
            )));
        }
        Ok(())
    }
}

/// Top-level configuration grouping every section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub analyzer: AnalyzerConfig,
    pub listener: ListenerConfig,
    pub pitch: PitchConfig,
}

impl TunerConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TunerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<()> {
        self.listener.validate()?;
        self.pitch.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TunerConfig::default();
        assert_eq!(config.listener.gain_threshold, 0.01);
        assert_eq!(config.listener.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.analyzer.fft_size.samples(), 2048);
        assert_eq!(config.analyzer.fft_size.bin_count(), 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fft_size_accepts_only_powers_of_two_in_range() {
        for exp in 5..=15 {
            assert!(FftSize::try_from(1u32 << exp).is_ok());
        }
        assert!(FftSize::try_from(16).is_err());
        assert!(FftSize::try_from(65536).is_err());
        assert!(FftSize::try_from(1000).is_err());
        assert!(FftSize::try_from(0).is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            TunerConfig::from_json_str(r#"{ "listener": { "poll_interval_ms": 20 } }"#).unwrap();
        assert_eq!(config.listener.poll_interval_ms, 20);
        assert_eq!(config.listener.gain_threshold, DEFAULT_GAIN_THRESHOLD);
        assert_eq!(config.analyzer, AnalyzerConfig::default());
        assert_eq!(config.pitch, PitchConfig::default());
    }

    #[test]
    fn test_json_rejects_bad_fft_size() {
        let err = TunerConfig::from_json_str(r#"{ "analyzer": { "fft_size": 1000 } }"#);
        assert!(matches!(err, Err(TunerError::Config(_))));
    }

    #[test]
    fn test_validation_errors() {
        let mut listener = ListenerConfig::default();
        listener.poll_interval_ms = 0;
        assert!(matches!(listener.validate(), Err(TunerError::InvalidConfig(_))));

        let mut listener = ListenerConfig::default();
        listener.gain_threshold = -0.5;
        assert!(listener.validate().is_err());
        listener.gain_threshold = f32::NAN;
        assert!(listener.validate().is_err());

        let mut pitch = PitchConfig::default();
        pitch.clarity_threshold = 1.5;
        assert!(pitch.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_uses_plain_fft_number() {
        let json = serde_json::to_string(&TunerConfig::default()).unwrap();
        assert!(json.contains("\"fft_size\":2048"));
        let parsed = TunerConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, TunerConfig::default());
    }
}
