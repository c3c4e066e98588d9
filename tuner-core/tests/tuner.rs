use std::f32::consts::PI;
use std::time::Duration;

use tuner_core::{AudioTuner, FrameSource, NoteEvent, TunerConfig, TunerError};

const SAMPLE_RATE: u32 = 44100;

fn sine(frequency: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.6 * (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

#[test]
fn detects_concert_a_from_fed_frames() -> anyhow::Result<()> {
    let config = TunerConfig::default();
    let (source, mut sender) = FrameSource::new(SAMPLE_RATE, &config.analyzer);
    let tuner = AudioTuner::connect(source, &config)?;

    let (tx, rx) = crossbeam_channel::unbounded::<NoteEvent>();
    tuner.add_note_listener(move |event| {
        let _ = tx.send(event.clone());
    });

    sender.push_samples(&sine(440.0, config.analyzer.fft_size.samples()));
    tuner.poll_once();

    let event = rx.try_recv()?;
    assert_eq!(event.note_number, 69);
    assert_eq!(event.name, "A");
    assert_eq!(event.octave, 4);
    assert!(event.cents.abs() <= 10, "cents {}", event.cents);
    Ok(())
}

#[test]
fn silence_before_first_frame() -> anyhow::Result<()> {
    let config = TunerConfig::default();
    let (source, _sender) = FrameSource::new(SAMPLE_RATE, &config.analyzer);
    let tuner = AudioTuner::connect(source, &config)?;

    let (tx, rx) = crossbeam_channel::unbounded::<NoteEvent>();
    tuner.add_note_listener(move |event| {
        let _ = tx.send(event.clone());
    });
    tuner.poll_once();

    assert!(rx.try_recv()?.is_silence());
    Ok(())
}

#[test]
fn running_tuner_reports_notes() -> anyhow::Result<()> {
    let config = TunerConfig::from_json_str(r#"{ "listener": { "poll_interval_ms": 10 } }"#)?;
    let (source, mut sender) = FrameSource::new(SAMPLE_RATE, &config.analyzer);
    let mut tuner = AudioTuner::connect(source, &config)?;

    let (tx, rx) = crossbeam_channel::unbounded::<NoteEvent>();
    tuner.add_note_listener(move |event| {
        let _ = tx.send(event.clone());
    });

    // E2 on a guitar's low string.
    sender.push_samples(&sine(82.41, config.analyzer.fft_size.samples() * 2));
    tuner.start()?;

    let event = rx.recv_timeout(Duration::from_secs(2))?;
    tuner.stop();
    tuner.stop();

    assert_eq!(event.name, "E");
    assert_eq!(event.octave, 2);
    assert!(!tuner.is_running());
    Ok(())
}

#[test]
fn start_without_connect_fails() -> anyhow::Result<()> {
    let config = TunerConfig::default();
    let (source, _sender) = FrameSource::new(SAMPLE_RATE, &config.analyzer);
    let mut tuner = AudioTuner::from_source(source, &config)?;

    assert!(matches!(tuner.start(), Err(TunerError::NotConnected)));
    assert!(!tuner.is_running());
    Ok(())
}

#[test]
fn connect_fails_once_producers_are_gone() {
    let config = TunerConfig::default();
    let (source, sender) = FrameSource::new(SAMPLE_RATE, &config.analyzer);
    drop(sender);

    let result = AudioTuner::connect(source, &config);
    assert!(matches!(result, Err(TunerError::SourceClosed)));
}
