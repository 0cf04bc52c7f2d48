use super::backend::{RecognizerBackend, RecognizerEvent, RecognizerSettings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the update channel toward the coordinator
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Recognition session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionState {
    /// Not capturing audio
    Idle,
    /// Actively capturing an utterance
    Listening,
}

/// Update emitted toward the session coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionUpdate {
    /// The capture attempt finished; emitted exactly once per started
    /// attempt, whether it ended via host stop, silence timeout or error
    Ended,

    /// The host reported a recognition failure
    Error { code: String },
}

/// Wraps a host speech-to-text capability behind a start/stop contract
///
/// The session owns the capture state, the accumulated utterance transcript
/// and the last host error code. A pump task per capture attempt drains the
/// backend's event stream, so all state transitions driven by the host
/// converge idempotently with explicit `stop()` calls.
pub struct RecognitionSession {
    /// Host capability, None when unsupported on this host
    backend: Option<Arc<Mutex<Box<dyn RecognizerBackend>>>>,

    /// Settings applied to every capture attempt
    settings: RecognizerSettings,

    /// Whether a capture attempt is active
    is_listening: Arc<AtomicBool>,

    /// Accumulated final text for the current utterance
    transcript: Arc<Mutex<String>>,

    /// Last host error code, cleared on every new capture attempt
    last_error: Arc<Mutex<Option<String>>>,

    /// Update sender toward the coordinator
    updates_tx: mpsc::Sender<RecognitionUpdate>,

    /// Update receiver, handed out once via `take_updates`
    updates_rx: Option<mpsc::Receiver<RecognitionUpdate>>,

    /// Handle for the event pump task
    pump_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RecognitionSession {
    /// Create a session over an optional host capability
    pub fn new(backend: Option<Box<dyn RecognizerBackend>>, settings: RecognizerSettings) -> Self {
        if backend.is_none() {
            warn!("speech recognition not supported on this host");
        }

        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            backend: backend.map(|b| Arc::new(Mutex::new(b))),
            settings,
            is_listening: Arc::new(AtomicBool::new(false)),
            transcript: Arc::new(Mutex::new(String::new())),
            last_error: Arc::new(Mutex::new(None)),
            updates_tx,
            updates_rx: Some(updates_rx),
            pump_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether the host offers speech recognition at all
    pub fn is_supported(&self) -> bool {
        self.backend.is_some()
    }

    /// Current session state
    pub fn state(&self) -> RecognitionState {
        if self.is_listening.load(Ordering::SeqCst) {
            RecognitionState::Listening
        } else {
            RecognitionState::Idle
        }
    }

    /// Accumulated final transcript of the current/last utterance
    pub async fn transcript(&self) -> String {
        self.transcript.lock().await.clone()
    }

    /// Last host error code, if any
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Take the update receiver; yields Some exactly once
    pub fn take_updates(&mut self) -> Option<mpsc::Receiver<RecognitionUpdate>> {
        self.updates_rx.take()
    }

    /// Begin capturing a new utterance
    ///
    /// No-op when recognition is unsupported. Clears the previous error and
    /// transcript before asking the host to capture. A synchronous host
    /// failure is logged only: the state stays Idle and no error code is
    /// recorded.
    pub async fn start(&self) {
        let Some(backend) = &self.backend else {
            return;
        };

        {
            let mut last_error = self.last_error.lock().await;
            *last_error = None;
        }
        {
            let mut transcript = self.transcript.lock().await;
            transcript.clear();
        }

        let events = {
            let mut backend = backend.lock().await;
            debug!(backend = %backend.name(), "requesting capture");
            match backend.start(&self.settings).await {
                Ok(events) => events,
                Err(e) => {
                    error!("failed to start recognition: {:#}", e);
                    return;
                }
            }
        };

        self.is_listening.store(true, Ordering::SeqCst);
        debug!(language = %self.settings.language, "listening started");

        let pump = Self::spawn_pump(
            events,
            Arc::clone(&self.is_listening),
            Arc::clone(&self.transcript),
            Arc::clone(&self.last_error),
            self.updates_tx.clone(),
        );

        let mut handle = self.pump_handle.lock().await;
        if let Some(stale) = handle.replace(pump) {
            // A pump from an earlier attempt that never saw its end event
            stale.abort();
        }
    }

    /// Request the host to stop capturing
    ///
    /// The session goes Idle immediately without waiting for the host's
    /// asynchronous end acknowledgment; the pump converges when it arrives.
    pub async fn stop(&self) {
        let Some(backend) = &self.backend else {
            return;
        };

        {
            let mut backend = backend.lock().await;
            if let Err(e) = backend.stop().await {
                warn!("failed to stop recognition: {:#}", e);
            }
        }

        self.is_listening.store(false, Ordering::SeqCst);
        debug!("listening stopped");
    }

    /// Tear the session down, releasing the host capture on every path
    pub async fn shutdown(&self) {
        if let Some(backend) = &self.backend {
            let mut backend = backend.lock().await;
            if let Err(e) = backend.stop().await {
                warn!("failed to release recognizer during shutdown: {:#}", e);
            }
        }

        self.is_listening.store(false, Ordering::SeqCst);

        let mut handle = self.pump_handle.lock().await;
        if let Some(pump) = handle.take() {
            pump.abort();
        }

        info!("recognition session shut down");
    }

    /// Drain one capture attempt's events into session state
    fn spawn_pump(
        mut events: mpsc::Receiver<RecognizerEvent>,
        is_listening: Arc<AtomicBool>,
        transcript: Arc<Mutex<String>>,
        last_error: Arc<Mutex<Option<String>>>,
        updates: mpsc::Sender<RecognitionUpdate>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // Final fragments accumulated for this utterance, in delivery
            // order. Interim fragments never land here.
            let mut accumulated = String::new();

            while let Some(event) = events.recv().await {
                match event {
                    RecognizerEvent::Result {
                        first_changed,
                        fragments,
                    } => {
                        let mut finalized = String::new();
                        for fragment in fragments.iter().skip(first_changed) {
                            if !fragment.is_final {
                                continue;
                            }
                            if let Some(best) = fragment.alternatives.first() {
                                finalized.push_str(&best.transcript);
                            }
                        }

                        if !finalized.is_empty() {
                            accumulated.push_str(&finalized);
                            // Replace the stored value wholesale rather than
                            // appending to it
                            let mut stored = transcript.lock().await;
                            stored.clear();
                            stored.push_str(&accumulated);
                            debug!(transcript = %accumulated, "final fragments accumulated");
                        }
                    }

                    RecognizerEvent::Error { code } => {
                        warn!(code = %code, "recognition error reported by host");
                        {
                            let mut last_error = last_error.lock().await;
                            *last_error = Some(code.clone());
                        }
                        is_listening.store(false, Ordering::SeqCst);
                        let _ = updates.send(RecognitionUpdate::Error { code }).await;
                    }

                    RecognizerEvent::End => break,
                }
            }

            // End event, closed channel and explicit stop all converge here
            is_listening.store(false, Ordering::SeqCst);
            let _ = updates.send(RecognitionUpdate::Ended).await;
            debug!("capture attempt ended");
        })
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        // Best effort: abort a still-running pump so no callback outlives
        // the session
        if let Ok(mut handle) = self.pump_handle.try_lock() {
            if let Some(pump) = handle.take() {
                pump.abort();
            }
        }
    }
}
