//! # Frame Feed Module
//!
//! An [`AudioSource`] whose data is pushed in by the host. The host keeps the
//! [`FrameSender`] half inside its own capture callback and the poller owns the
//! [`FrameSource`] half; bounded crossbeam channels sit between them, one for
//! waveform windows and one for spectra.
//!
//! ## Behaviour
//! - Raw samples are accumulated into windows of `fft_size` samples; each complete
//!   window is sent as one frame
//! - When a channel is full the oldest queued frame is evicted, so a slow poller
//!   never blocks the capture callback and never falls behind the newest audio
//! - Spectra are computed by the host and pushed as dBFS magnitudes
//! - The source always reports the most recent window and spectrum it has seen
//!   while connected; anything queued while disconnected is discarded on connect

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use tracing::{debug, trace, warn};

use crate::config::{AnalyzerConfig, FftSize};
use crate::error::{Result, TunerError};
use crate::source::{decibels_to_byte, sample_to_byte, AudioSource};

/// Number of frames each channel holds before the oldest is evicted.
pub const FRAME_QUEUE_DEPTH: usize = 8;

/// Sending end of one channel, plus a receiver used to evict the oldest frame.
#[derive(Debug, Clone)]
struct Lane {
    sender: Sender<Vec<f32>>,
    stale: Receiver<Vec<f32>>,
}

impl Lane {
    fn send(&self, mut frame: Vec<f32>) -> bool {
        loop {
            match self.sender.try_send(frame) {
                Ok(()) => return true,
                Err(TrySendError::Full(rejected)) => {
                    trace!("frame queue full, evicting oldest frame");
                    let _ = self.stale.try_recv();
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }
}

/// Producer half of a frame feed.
#[derive(Debug)]
pub struct FrameSender {
    waveforms: Lane,
    spectra: Lane,
    fft_size: FftSize,
    // Samples received since the last complete window.
    pending: Vec<f32>,
}

impl Clone for FrameSender {
    fn clone(&self) -> Self {
        Self {
            waveforms: self.waveforms.clone(),
            spectra: self.spectra.clone(),
            fft_size: self.fft_size,
            pending: Vec::with_capacity(self.fft_size.samples() * 2),
        }
    }
}

impl FrameSender {
    /// Appends captured samples and ships every complete window.
    ///
    /// Returns the number of windows that were queued.
    pub fn push_samples(&mut self, samples: &[f32]) -> usize {
        let window = self.fft_size.samples();
        self.pending.extend_from_slice(samples);

        let mut queued = 0;
        while self.pending.len() >= window {
            let frame = self.pending[..window].to_vec();
            self.pending.drain(..window);
            if self.waveforms.send(frame) {
                queued += 1;
            }
        }
        queued
    }

    /// Replaces the spectrum reported by the source. Values are dBFS per bin.
    pub fn push_spectrum(&self, decibels: Vec<f32>) -> bool {
        self.spectra.send(decibels)
    }
}

/// Consumer half of a frame feed; implements [`AudioSource`].
#[derive(Debug)]
pub struct FrameSource {
    waveforms: Receiver<Vec<f32>>,
    spectra: Receiver<Vec<f32>>,
    sample_rate: u32,
    fft_size: FftSize,
    connected: bool,
    waveform: Vec<f32>,
    spectrum: Vec<f32>,
}

impl FrameSource {
    /// Creates a disconnected source and the sender that feeds it.
    pub fn new(sample_rate: u32, config: &AnalyzerConfig) -> (FrameSource, FrameSender) {
        let (waveform_tx, waveform_rx) = crossbeam_channel::bounded(FRAME_QUEUE_DEPTH);
        let (spectrum_tx, spectrum_rx) = crossbeam_channel::bounded(FRAME_QUEUE_DEPTH);
        let fft_size = config.fft_size;
        let source = FrameSource {
            waveforms: waveform_rx.clone(),
            spectra: spectrum_rx.clone(),
            sample_rate,
            fft_size,
            connected: false,
            waveform: Vec::new(),
            spectrum: Vec::new(),
        };
        let sender = FrameSender {
            waveforms: Lane {
                sender: waveform_tx,
                stale: waveform_rx,
            },
            spectra: Lane {
                sender: spectrum_tx,
                stale: spectrum_rx,
            },
            fft_size,
            pending: Vec::with_capacity(fft_size.samples() * 2),
        };
        (source, sender)
    }

    /// Moves every queued frame into the latest-state buffers.
    ///
    /// Returns `false` once all senders are gone and the queues are empty.
    fn drain(&mut self) -> bool {
        let open = latest(&self.waveforms, &mut self.waveform);
        latest(&self.spectra, &mut self.spectrum);
        open
    }

    fn refresh(&mut self) {
        if self.connected {
            self.drain();
        }
    }

    fn copy_waveform(&self, buf: &mut Vec<f32>) {
        buf.clear();
        buf.extend_from_slice(&self.waveform);
        buf.resize(self.fft_size.samples(), 0.0);
    }

    fn copy_spectrum(&self, buf: &mut Vec<f32>) {
        buf.clear();
        buf.extend_from_slice(&self.spectrum);
        buf.resize(self.fft_size.bin_count(), f32::NEG_INFINITY);
    }
}

/// Replaces `slot` with the newest queued frame. Returns `false` if the channel is closed.
fn latest(frames: &Receiver<Vec<f32>>, slot: &mut Vec<f32>) -> bool {
    loop {
        match frames.try_recv() {
            Ok(frame) => *slot = frame,
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Disconnected) => return false,
        }
    }
}

impl AudioSource for FrameSource {
    /// Marks the source connected, discarding whatever was queued while disconnected.
    fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        if !self.drain() {
            warn!("cannot connect frame source: every sender was dropped");
            return Err(TunerError::SourceClosed);
        }
        self.waveform.clear();
        self.spectrum.clear();
        self.connected = true;
        debug!(sample_rate = self.sample_rate, fft_size = %self.fft_size, "frame source connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.drain();
            self.waveform.clear();
            self.spectrum.clear();
            self.connected = false;
            debug!("frame source disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fft_size(&self) -> FftSize {
        self.fft_size
    }

    fn float_time_domain_data(&mut self, buf: &mut Vec<f32>) {
        self.refresh();
        self.copy_waveform(buf);
    }

    fn byte_time_domain_data(&mut self, buf: &mut Vec<u8>) {
        self.refresh();
        let window = self.fft_size.samples();
        buf.clear();
        buf.extend(self.waveform.iter().map(|&s| sample_to_byte(s)));
        buf.resize(window, sample_to_byte(0.0));
    }

    fn float_frequency_data(&mut self, buf: &mut Vec<f32>) {
        self.refresh();
        self.copy_spectrum(buf);
    }

    fn byte_frequency_data(&mut self, buf: &mut Vec<u8>) {
        self.refresh();
        let bins = self.fft_size.bin_count();
        buf.clear();
        buf.extend(self.spectrum.iter().take(bins).map(|&db| decibels_to_byte(db)));
        buf.resize(bins, 0);
    }
}
