//! # Audio Source Module
//!
//! The narrow interface the poller consumes. An implementation wraps whatever the
//! host uses to capture and analyse audio (a browser analyser node, a native
//! capture callback, a test fixture) and copies its latest buffers on request.
//!
//! Every accessor takes a caller-owned `Vec` and resizes it to the required length
//! before filling it, so a poller that keeps its buffers around allocates only on
//! the first read.

use crate::config::FftSize;
use crate::error::Result;

/// The four buffer kinds an [`AudioSource`] can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Waveform samples in -1.0..=1.0.
    FloatTimeDomain,
    /// Waveform samples quantised to 0..=255 with 128 as silence.
    ByteTimeDomain,
    /// Per-bin magnitudes in dBFS.
    FloatFrequency,
    /// Per-bin magnitudes scaled to 0..=255.
    ByteFrequency,
}

impl BufferKind {
    pub const ALL: [BufferKind; 4] = [
        BufferKind::FloatTimeDomain,
        BufferKind::ByteTimeDomain,
        BufferKind::FloatFrequency,
        BufferKind::ByteFrequency,
    ];

    /// Whether the poller's gain gate applies to this kind.
    pub fn is_time_domain(self) -> bool {
        matches!(self, BufferKind::FloatTimeDomain | BufferKind::ByteTimeDomain)
    }
}

/// A connected stream of analysis buffers.
pub trait AudioSource {
    /// Acquires the live stream. Calling it on a connected source does nothing.
    fn connect(&mut self) -> Result<()>;

    /// Releases the stream. Calling it on a disconnected source does nothing.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Sample rate of the time-domain data in Hz.
    fn sample_rate(&self) -> u32;

    fn fft_size(&self) -> FftSize;

    fn frequency_bin_count(&self) -> usize {
        self.fft_size().bin_count()
    }

    /// Copies the current waveform into `buf` (`fft_size` samples).
    fn float_time_domain_data(&mut self, buf: &mut Vec<f32>);

    /// Copies the current waveform into `buf` (`fft_size` samples), byte-quantised.
    fn byte_time_domain_data(&mut self, buf: &mut Vec<u8>);

    /// Copies the current spectrum into `buf` (`frequency_bin_count` bins) in dBFS.
    fn float_frequency_data(&mut self, buf: &mut Vec<f32>);

    /// Copies the current spectrum into `buf` (`frequency_bin_count` bins), byte-scaled.
    fn byte_frequency_data(&mut self, buf: &mut Vec<u8>);
}

/// Lower bound of the byte frequency scale in dBFS.
pub const MIN_DECIBELS: f32 = -100.0;
/// Upper bound of the byte frequency scale in dBFS.
pub const MAX_DECIBELS: f32 = -30.0;

/// Quantises a waveform sample to a byte, mapping 0.0 to 128.
pub fn sample_to_byte(sample: f32) -> u8 {
    (128.0 * (1.0 + sample)).floor().clamp(0.0, 255.0) as u8
}

/// Scales a dBFS magnitude onto 0..=255 between [`MIN_DECIBELS`] and [`MAX_DECIBELS`].
pub fn decibels_to_byte(db: f32) -> u8 {
    if db.is_nan() {
        return 0;
    }
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.floor().clamp(0.0, 255.0) as u8
}
