// tuner-core/src/lib.rs

//! The core logic for an instrument tuner.
//! This crate polls an audio analysis source, estimates the fundamental
//! frequency of each waveform window and reports the nearest note, its octave
//! and the offset in cents. It performs no capture and contains no GUI code;
//! the host supplies audio through the [`AudioSource`] trait.
//!
//! ```no_run
//! use tuner_core::{AudioTuner, FrameSource, TunerConfig};
//!
//! # fn main() -> tuner_core::Result<()> {
//! let config = TunerConfig::default();
//! let (source, mut sender) = FrameSource::new(44100, &config.analyzer);
//! let mut tuner = AudioTuner::connect(source, &config)?;
//! tuner.add_note_listener(|note| println!("{}{} {:+} cents", note.name, note.octave, note.cents));
//! tuner.start()?;
//! // From the capture callback:
//! sender.push_samples(&[0.0; 512]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod listener;
pub mod pitch;
pub mod source;
pub mod tuner;
pub mod tuning;

pub use config::{AnalyzerConfig, FftSize, ListenerConfig, PitchConfig, TunerConfig};
pub use error::{Result, TunerError};
pub use events::SubscriptionId;
pub use feed::{FrameSender, FrameSource};
pub use listener::AnalyserListener;
pub use pitch::{McLeodEstimator, PitchEstimator};
pub use source::{AudioSource, BufferKind};
pub use tuner::{AudioTuner, NoteEvent};
