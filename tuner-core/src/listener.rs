//! # Analyser Listener Module
//!
//! Polls an [`AudioSource`] at a fixed interval and republishes its buffers to
//! subscribers, one typed registry per [`BufferKind`].
//!
//! ## Architecture
//! - **Caller thread**: registers callbacks, starts and stops polling
//! - **Poll thread**: a crossbeam `tick` drives one poll per interval; a bounded
//!   shutdown channel ends the loop
//! - **Shared state**: the source, the scratch buffers and the registries sit behind
//!   one mutex that a tick holds for its whole duration
//!
//! A buffer kind nobody listens to is never read from the source. Time-domain buffers
//! go through a gain gate: when no sample exceeds the configured threshold, listeners
//! receive `None` instead of the buffer.
//!
//! Callbacks run on the poll thread while the shared state is locked, so they must not
//! call back into the listener.

use crossbeam_channel::{select, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

use crate::config::ListenerConfig;
use crate::error::{Result, TunerError};
use crate::events::{BufferCallback, Subscribers, SubscriptionId};
use crate::source::{AudioSource, BufferKind};

/// Returns `true` if any sample is strictly above `threshold`.
pub fn exceeds_gain<T: Copy + Into<f32>>(samples: &[T], threshold: f32) -> bool {
    samples.iter().any(|&s| s.into() > threshold)
}

/// A registry plus the scratch buffer reused for every read of its kind.
struct Channel<T> {
    subscribers: Subscribers<dyn FnMut(Option<&[T]>) + Send>,
    scratch: Vec<T>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            subscribers: Subscribers::default(),
            scratch: Vec::new(),
        }
    }
}

impl<T: Copy + Into<f32>> Channel<T> {
    /// Publishes the scratch buffer, or `None` if `gate` is set and nothing exceeds it.
    fn publish(&mut self, gate: Option<f32>) {
        let open = gate.map_or(true, |threshold| exceeds_gain(&self.scratch, threshold));
        let payload = open.then_some(self.scratch.as_slice());
        self.subscribers.emit(payload);
    }
}

struct PollState<S> {
    source: S,
    gain_threshold: f32,
    float_time: Channel<f32>,
    byte_time: Channel<u8>,
    float_freq: Channel<f32>,
    byte_freq: Channel<u8>,
}

impl<S: AudioSource> PollState<S> {
    fn subscriber_count(&self, kind: BufferKind) -> usize {
        match kind {
            BufferKind::FloatTimeDomain => self.float_time.subscribers.len(),
            BufferKind::ByteTimeDomain => self.byte_time.subscribers.len(),
            BufferKind::FloatFrequency => self.float_freq.subscribers.len(),
            BufferKind::ByteFrequency => self.byte_freq.subscribers.len(),
        }
    }

    fn poll(&mut self) {
        let PollState {
            source,
            gain_threshold,
            float_time,
            byte_time,
            float_freq,
            byte_freq,
        } = self;

        if !float_time.subscribers.is_empty() {
            source.float_time_domain_data(&mut float_time.scratch);
            float_time.publish(Some(*gain_threshold));
        }

        if !byte_time.subscribers.is_empty() {
            source.byte_time_domain_data(&mut byte_time.scratch);
            byte_time.publish(Some(*gain_threshold * 255.0));
        }

        if !float_freq.subscribers.is_empty() {
            source.float_frequency_data(&mut float_freq.scratch);
            float_freq.publish(None);
        }

        if !byte_freq.subscribers.is_empty() {
            source.byte_frequency_data(&mut byte_freq.scratch);
            byte_freq.publish(None);
        }
    }
}

/// Handle to the running poll thread.
struct PollWorker {
    shutdown_tx: Sender<()>,
    thread_handle: JoinHandle<()>,
}

/// Reads audio buffers at a fixed interval and sends them to listeners.
pub struct AnalyserListener<S> {
    shared: Arc<Mutex<PollState<S>>>,
    config: ListenerConfig,
    worker: Option<PollWorker>,
}

impl<S: AudioSource + Send + 'static> AnalyserListener<S> {
    /// Builds a stopped listener around `source`. The source may still be disconnected.
    pub fn new(source: S, config: ListenerConfig) -> Result<Self> {
        config.validate()?;
        let shared = PollState {
            source,
            gain_threshold: config.gain_threshold,
            float_time: Channel::default(),
            byte_time: Channel::default(),
            float_freq: Channel::default(),
            byte_freq: Channel::default(),
        };
        Ok(Self {
            shared: Arc::new(Mutex::new(shared)),
            config,
            worker: None,
        })
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts polling. Does nothing if already running.
    ///
    /// # Errors
    /// * `TunerError::NotConnected` - the source is not connected; nothing is started
    /// * `TunerError::Io` - the poll thread could not be spawned
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        if !self.shared.lock().source.is_connected() {
            return Err(TunerError::NotConnected);
        }

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let ticker = crossbeam_channel::tick(self.config.poll_interval());
        let shared = Arc::clone(&self.shared);

        let thread_handle = thread::Builder::new()
            .name("tuner-poll".into())
            .spawn(move || {
                debug!("poll thread started");
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            trace!("poll tick");
                            shared.lock().poll();
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                debug!("poll thread finished");
            })?;

        debug!(interval_ms = self.config.poll_interval_ms, "listener started");
        self.worker = Some(PollWorker {
            shutdown_tx,
            thread_handle,
        });
        Ok(())
    }

    /// Stops polling and waits for the poll thread to exit. Does nothing if stopped.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown_tx.send(());
            if worker.thread_handle.join().is_err() {
                warn!("poll thread panicked");
            }
            debug!("listener stopped");
        }
    }

    /// Runs one poll on the calling thread.
    pub fn poll_once(&self) {
        self.shared.lock().poll();
    }

    /// Connects the underlying source.
    pub fn connect(&self) -> Result<()> {
        self.shared.lock().source.connect()
    }

    /// Stops polling and disconnects the underlying source.
    pub fn disconnect(&mut self) {
        self.stop();
        self.shared.lock().source.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().source.is_connected()
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.lock().source.sample_rate()
    }

    /// Gives scoped access to the source.
    pub fn with_source<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.shared.lock().source)
    }

    /// Number of callbacks registered for `kind`.
    pub fn subscriber_count(&self, kind: BufferKind) -> usize {
        self.shared.lock().subscriber_count(kind)
    }

    pub fn add_float_time_domain_listener(
        &self,
        callback: impl FnMut(Option<&[f32]>) + Send + 'static,
    ) -> SubscriptionId {
        let callback: BufferCallback<f32> = Box::new(callback);
        self.shared.lock().float_time.subscribers.add(callback)
    }

    pub fn remove_float_time_domain_listener(&self, id: SubscriptionId) -> bool {
        self.shared.lock().float_time.subscribers.remove(id)
    }

    pub fn add_byte_time_domain_listener(
        &self,
        callback: impl FnMut(Option<&[u8]>) + Send + 'static,
    ) -> SubscriptionId {
        let callback: BufferCallback<u8> = Box::new(callback);
        self.shared.lock().byte_time.subscribers.add(callback)
    }

    pub fn remove_byte_time_domain_listener(&self, id: SubscriptionId) -> bool {
        self.shared.lock().byte_time.subscribers.remove(id)
    }

    /// Frequency buffers are not gain gated; callbacks always receive `Some`.
    pub fn add_float_frequency_listener(
        &self,
        callback: impl FnMut(Option<&[f32]>) + Send + 'static,
    ) -> SubscriptionId {
        let callback: BufferCallback<f32> = Box::new(callback);
        self.shared.lock().float_freq.subscribers.add(callback)
    }

    pub fn remove_float_frequency_listener(&self, id: SubscriptionId) -> bool {
        self.shared.lock().float_freq.subscribers.remove(id)
    }

    /// Frequency buffers are not gain gated; callbacks always receive `Some`.
    pub fn add_byte_frequency_listener(
        &self,
        callback: impl FnMut(Option<&[u8]>) + Send + 'static,
    ) -> SubscriptionId {
        let callback: BufferCallback<u8> = Box::new(callback);
        self.shared.lock().byte_freq.subscribers.add(callback)
    }

    pub fn remove_byte_frequency_listener(&self, id: SubscriptionId) -> bool {
        self.shared.lock().byte_freq.subscribers.remove(id)
    }
}

impl<S> Drop for AnalyserListener<S> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown_tx.send(());
            let _ = worker.thread_handle.join();
        }
    }
}
