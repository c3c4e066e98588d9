//! # Audio Tuner Module
//!
//! Turns float time-domain buffers from an [`AnalyserListener`] into [`NoteEvent`]s.
//!
//! Per poll tick:
//! 1. A gated (silent) tick emits [`NoteEvent::silence`]
//! 2. Otherwise the pitch estimator is asked for a fundamental frequency
//! 3. A detected frequency is mapped to note number, name, octave and cents
//! 4. No estimate means no event for that tick
//!
//! Nothing is computed while no note listener is registered.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::config::{ListenerConfig, PitchConfig, TunerConfig};
use crate::error::{Result, TunerError};
use crate::events::{Subscribers, SubscriptionId};
use crate::listener::AnalyserListener;
use crate::pitch::{McLeodEstimator, PitchEstimator};
use crate::source::AudioSource;
use crate::tuning;

/// The note nearest to a detected frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    /// MIDI-style note number (69 = A4).
    pub note_number: i32,
    /// Note name without octave, empty for silence.
    pub name: &'static str,
    pub octave: i32,
    /// Offset from the note's exact pitch, floored.
    pub cents: i32,
    /// Detected frequency in Hz.
    pub frequency: f64,
}

impl NoteEvent {
    /// The event emitted on a tick whose buffer was below the gain threshold.
    pub const fn silence() -> Self {
        Self {
            note_number: 0,
            name: "",
            octave: 0,
            cents: 0,
            frequency: 0.0,
        }
    }

    pub fn is_silence(&self) -> bool {
        *self == Self::silence()
    }

    /// Maps a frequency to its nearest note. Returns `None` unless it is positive and finite.
    pub fn from_frequency(frequency: f64) -> Option<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }
        let note = tuning::note_number(frequency);
        Some(Self {
            note_number: note,
            name: tuning::note_name(note),
            octave: tuning::octave(note),
            cents: tuning::cents_off(frequency, note),
            frequency,
        })
    }
}

type NoteCallback = dyn FnMut(&NoteEvent) + Send;

struct NoteState {
    subscribers: Subscribers<NoteCallback>,
    estimator: Box<dyn PitchEstimator>,
}

impl NoteState {
    fn handle_buffer(&mut self, data: Option<&[f32]>) {
        if self.subscribers.is_empty() {
            return;
        }
        let event = match data {
            None => NoteEvent::silence(),
            Some(samples) => {
                let Some(event) = self
                    .estimator
                    .estimate(samples)
                    .and_then(|frequency| NoteEvent::from_frequency(f64::from(frequency)))
                else {
                    return;
                };
                event
            }
        };
        self.subscribers.for_each(|callback| callback(&event));
    }
}

/// Analyzes audio data and converts it into musical note info for tuning.
pub struct AudioTuner<S> {
    listener: AnalyserListener<S>,
    notes: Arc<Mutex<NoteState>>,
    buffer_subscription: SubscriptionId,
}

impl<S: AudioSource + Send + 'static> AudioTuner<S> {
    /// Connects `source`, then builds a tuner around it. Connect failures are returned as-is.
    pub fn connect(mut source: S, config: &TunerConfig) -> Result<Self> {
        source.connect()?;
        debug!("audio source connected");
        Self::from_source(source, config)
    }

    /// Builds a tuner around a source that may not be connected yet.
    ///
    /// The source's window size must match `config.analyzer.fft_size`.
    pub fn from_source(source: S, config: &TunerConfig) -> Result<Self> {
        config.validate()?;
        if source.fft_size() != config.analyzer.fft_size {
            return Err(TunerError::InvalidConfig(format!(
                "source fft size {} does not match configured fft size {}",
                source.fft_size(),
                config.analyzer.fft_size
            )));
        }
        let listener = AnalyserListener::new(source, config.listener.clone())?;
        Self::from_listener(listener, &config.pitch)
    }

    /// Builds a tuner using the default McLeod estimator at the source's sample rate.
    pub fn from_listener(listener: AnalyserListener<S>, pitch: &PitchConfig) -> Result<Self> {
        pitch.validate()?;
        let estimator = McLeodEstimator::new(listener.sample_rate(), pitch);
        Ok(Self::with_estimator(listener, estimator))
    }

    /// Builds a tuner with a custom pitch estimator.
    pub fn with_estimator(
        listener: AnalyserListener<S>,
        estimator: impl PitchEstimator + 'static,
    ) -> Self {
        let notes = Arc::new(Mutex::new(NoteState {
            subscribers: Subscribers::default(),
            estimator: Box::new(estimator),
        }));
        let handler = Arc::clone(&notes);
        let buffer_subscription = listener
            .add_float_time_domain_listener(move |data| handler.lock().handle_buffer(data));
        Self {
            listener,
            notes,
            buffer_subscription,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.listener.start()
    }

    pub fn stop(&mut self) {
        self.listener.stop();
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_running()
    }

    /// Processes one buffer on the calling thread; see [`AnalyserListener::poll_once`].
    pub fn poll_once(&self) {
        self.listener.poll_once();
    }

    pub fn add_note_listener(
        &self,
        callback: impl FnMut(&NoteEvent) + Send + 'static,
    ) -> SubscriptionId {
        let callback: Box<NoteCallback> = Box::new(callback);
        self.notes.lock().subscribers.add(callback)
    }

    pub fn remove_note_listener(&self, id: SubscriptionId) -> bool {
        self.notes.lock().subscribers.remove(id)
    }

    pub fn note_listener_count(&self) -> usize {
        self.notes.lock().subscribers.len()
    }

    pub fn listener(&self) -> &AnalyserListener<S> {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut AnalyserListener<S> {
        &mut self.listener
    }

    /// Unregisters the tuner from its listener and hands the listener back.
    pub fn into_listener(self) -> AnalyserListener<S> {
        let Self {
            listener,
            buffer_subscription,
            ..
        } = self;
        listener.remove_float_time_domain_listener(buffer_subscription);
        listener
    }

    pub fn listener_config(&self) -> &ListenerConfig {
        self.listener.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::tests::ScriptedSource;
    use crate::config::{AnalyzerConfig, FftSize};
    use crate::feed::FrameSource;
    use crate::source::BufferKind;

    fn tuner_with(
        samples: Vec<f32>,
        estimate: impl FnMut(&[f32]) -> Option<f32> + Send + 'static,
    ) -> AudioTuner<ScriptedSource> {
        let listener =
            AnalyserListener::new(ScriptedSource::connected(samples), ListenerConfig::default())
                .unwrap();
        AudioTuner::with_estimator(listener, estimate)
    }

    fn record(tuner: &AudioTuner<ScriptedSource>) -> Arc<Mutex<Vec<NoteEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        tuner.add_note_listener(move |event| sink.lock().push(event.clone()));
        events
    }

    #[test]
    fn test_from_frequency() {
        let event = NoteEvent::from_frequency(440.0).unwrap();
        assert_eq!(
            event,
            NoteEvent {
                note_number: 69,
                name: "A",
                octave: 4,
                cents: 0,
                frequency: 440.0
            }
        );
        assert!(!event.is_silence());
        assert_eq!(NoteEvent::from_frequency(0.0), None);
        assert_eq!(NoteEvent::from_frequency(-5.0), None);
        assert_eq!(NoteEvent::from_frequency(f64::NAN), None);
    }

    #[test]
    fn test_signal_emits_note() {
        let tuner = tuner_with(vec![0.5; 32], |_: &[f32]| Some(466.16));
        let events = record(&tuner);
        tuner.poll_once();

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].note_number, 70);
        assert_eq!(events[0].name, "A♯");
        assert_eq!(events[0].octave, 4);
        assert!((events[0].frequency - 466.16).abs() < 1e-3);
    }

    #[test]
    fn test_silence_emits_zero_event() {
        let tuner = tuner_with(vec![0.5; 32], |_: &[f32]| Some(440.0));
        let events = record(&tuner);

        tuner.poll_once();
        tuner.listener().with_source(|source| source.samples = vec![0.001; 32]);
        tuner.poll_once();

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "A");
        assert_eq!(events[1], NoteEvent::silence());
        assert!(events[1].is_silence());
    }

    #[test]
    fn test_no_estimate_emits_nothing() {
        let tuner = tuner_with(vec![0.5; 32], |_: &[f32]| None);
        let events = record(&tuner);
        tuner.poll_once();
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_estimator_skipped_without_note_listeners() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let tuner = tuner_with(vec![0.5; 32], move |_: &[f32]| {
            *counter.lock() += 1;
            Some(440.0)
        });

        tuner.poll_once();
        assert_eq!(*calls.lock(), 0);

        let id = tuner.add_note_listener(|_| {});
        tuner.poll_once();
        assert_eq!(*calls.lock(), 1);

        assert!(tuner.remove_note_listener(id));
        tuner.poll_once();
        assert_eq!(*calls.lock(), 1);
        assert_eq!(tuner.note_listener_count(), 0);
    }

    #[test]
    fn test_tuner_subscribes_to_float_time_domain() {
        let tuner = tuner_with(vec![0.5; 32], |_: &[f32]| None);
        assert_eq!(
            tuner.listener().subscriber_count(BufferKind::FloatTimeDomain),
            1
        );
        let listener = tuner.into_listener();
        assert_eq!(listener.subscriber_count(BufferKind::FloatTimeDomain), 0);
    }

    #[test]
    fn test_start_requires_connection() {
        let config = TunerConfig::default();
        let mut tuner = AudioTuner::from_source(ScriptedSource::default(), &config).unwrap();
        assert!(matches!(tuner.start(), Err(TunerError::NotConnected)));
        assert!(!tuner.is_running());

        tuner.listener().connect().unwrap();
        tuner.start().unwrap();
        assert!(tuner.is_running());
        tuner.stop();
        tuner.stop();
        assert!(!tuner.is_running());
    }

    #[test]
    fn test_from_source_rejects_mismatched_fft_size() {
        let config = TunerConfig::default();
        let small = AnalyzerConfig {
            fft_size: FftSize::try_from(512).unwrap(),
        };
        let (source, _sender) = FrameSource::new(44100, &small);
        let result = AudioTuner::from_source(source, &config);
        assert!(matches!(result, Err(TunerError::InvalidConfig(_))));

        let (source, _sender) = FrameSource::new(44100, &config.analyzer);
        assert!(AudioTuner::from_source(source, &config).is_ok());
    }

    #[test]
    fn test_connect_factory_connects() {
        let tuner = AudioTuner::connect(ScriptedSource::default(), &TunerConfig::default()).unwrap();
        assert!(tuner.listener().is_connected());
        assert_eq!(tuner.listener_config(), &ListenerConfig::default());
    }

    #[test]
    fn test_event_serialises_camel_case() {
        let json = serde_json::to_string(&NoteEvent::from_frequency(440.0).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"noteNumber":69,"name":"A","octave":4,"cents":0,"frequency":440.0}"#
        );
    }
}
