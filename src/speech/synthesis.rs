use super::backend::{SynthesizerBackend, SynthesizerEvent, UtteranceRequest, VoiceInfo};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Synthesis session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakingState {
    /// No utterance is playing
    Idle,
    /// An utterance is playing
    Speaking,
}

/// Settings applied to every utterance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSettings {
    /// Voice-name substrings to prefer, in order
    pub preferred_voices: Vec<String>,
    /// Speech rate (1.0 = neutral)
    pub rate: f32,
    /// Voice pitch (1.0 = neutral)
    pub pitch: f32,
    /// Playback volume (1.0 = full)
    pub volume: f32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            preferred_voices: vec!["Google".to_string(), "Natural".to_string()],
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Wraps a host text-to-speech capability behind a speak/stop contract
///
/// At most one utterance is active at a time: every `speak` cancels
/// whatever the host still has queued or playing before submitting the new
/// utterance. Utterance lifecycle events are drained by a pump task guarded
/// by an epoch counter, so a late event from a cancelled utterance can
/// never resurrect stale speaking state.
pub struct SynthesisSession {
    /// Host capability, None when unsupported on this host
    backend: Option<Arc<Mutex<Box<dyn SynthesizerBackend>>>>,

    /// Settings applied to every utterance
    settings: SynthesisSettings,

    /// Whether an utterance is currently playing
    is_speaking: Arc<AtomicBool>,

    /// Bumped on every speak/stop; pumps with a stale epoch stop writing
    epoch: Arc<AtomicU64>,

    /// Handle for the current utterance's pump task
    pump_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SynthesisSession {
    /// Create a session over an optional host capability
    pub fn new(backend: Option<Box<dyn SynthesizerBackend>>, settings: SynthesisSettings) -> Self {
        if backend.is_none() {
            warn!("speech synthesis not supported on this host");
        }

        Self {
            backend: backend.map(|b| Arc::new(Mutex::new(b))),
            settings,
            is_speaking: Arc::new(AtomicBool::new(false)),
            epoch: Arc::new(AtomicU64::new(0)),
            pump_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether the host offers speech synthesis at all
    pub fn is_supported(&self) -> bool {
        self.backend.is_some()
    }

    /// Current session state
    pub fn state(&self) -> SpeakingState {
        if self.is_speaking.load(Ordering::SeqCst) {
            SpeakingState::Speaking
        } else {
            SpeakingState::Idle
        }
    }

    /// Whether an utterance is currently playing
    pub fn is_speaking(&self) -> bool {
        self.is_speaking.load(Ordering::SeqCst)
    }

    /// Speak the given text, replacing any active utterance
    ///
    /// No-op when synthesis is unsupported or the text is empty.
    pub async fn speak(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let Some(backend) = &self.backend else {
            return;
        };

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let events = {
            let mut backend = backend.lock().await;

            // At most one active utterance; the replaced utterance's late
            // events are epoch-blocked, so the state drops here
            if let Err(e) = backend.cancel().await {
                warn!("failed to cancel previous utterance: {:#}", e);
            }
            self.is_speaking.store(false, Ordering::SeqCst);

            let voices = backend.voices().await;
            let voice = select_voice(&voices, &self.settings.preferred_voices);

            let utterance = UtteranceRequest {
                text: text.to_string(),
                rate: self.settings.rate,
                pitch: self.settings.pitch,
                volume: self.settings.volume,
                voice,
            };

            debug!(backend = %backend.name(), chars = text.len(), "queueing utterance");
            match backend.speak(utterance).await {
                Ok(events) => events,
                Err(e) => {
                    warn!("failed to queue utterance: {:#}", e);
                    return;
                }
            }
        };

        let pump = Self::spawn_pump(
            events,
            epoch,
            Arc::clone(&self.epoch),
            Arc::clone(&self.is_speaking),
        );

        let mut handle = self.pump_handle.lock().await;
        if let Some(stale) = handle.replace(pump) {
            stale.abort();
        }
    }

    /// Cancel any active or queued utterance
    ///
    /// The session goes Idle immediately without waiting for the host's
    /// asynchronous cancel acknowledgment.
    pub async fn stop(&self) {
        let Some(backend) = &self.backend else {
            return;
        };

        self.epoch.fetch_add(1, Ordering::SeqCst);

        {
            let mut backend = backend.lock().await;
            if let Err(e) = backend.cancel().await {
                warn!("failed to cancel utterance: {:#}", e);
            }
        }

        self.is_speaking.store(false, Ordering::SeqCst);
        debug!("synthesis stopped");
    }

    /// Tear the session down, cancelling any in-flight utterance
    pub async fn shutdown(&self) {
        self.stop().await;

        let mut handle = self.pump_handle.lock().await;
        if let Some(pump) = handle.take() {
            pump.abort();
        }

        info!("synthesis session shut down");
    }

    /// Drain one utterance's lifecycle events into session state
    fn spawn_pump(
        mut events: tokio::sync::mpsc::Receiver<SynthesizerEvent>,
        my_epoch: u64,
        epoch: Arc<AtomicU64>,
        is_speaking: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // Only the pump for the newest utterance may write state
            let current = |epoch: &AtomicU64| epoch.load(Ordering::SeqCst) == my_epoch;

            while let Some(event) = events.recv().await {
                match event {
                    SynthesizerEvent::Started => {
                        if current(&epoch) {
                            is_speaking.store(true, Ordering::SeqCst);
                            debug!("utterance playback started");
                        }
                    }
                    SynthesizerEvent::Ended => {
                        if current(&epoch) {
                            is_speaking.store(false, Ordering::SeqCst);
                            debug!("utterance playback ended");
                        }
                        return;
                    }
                    SynthesizerEvent::Error { code } => {
                        // Playback failure is non-fatal: reset state only
                        warn!(code = %code, "utterance playback failed");
                        if current(&epoch) {
                            is_speaking.store(false, Ordering::SeqCst);
                        }
                        return;
                    }
                }
            }

            // Channel closed without an end event: the utterance was dropped
            if current(&epoch) {
                is_speaking.store(false, Ordering::SeqCst);
            }
        })
    }
}

impl Drop for SynthesisSession {
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

/// Pick a voice: first preferred-substring match, then the host default,
/// then the first offered voice, then none at all
fn select_voice(voices: &[VoiceInfo], preferred: &[String]) -> Option<String> {
    for needle in preferred {
        if let Some(voice) = voices.iter().find(|v| v.name.contains(needle.as_str())) {
            return Some(voice.name.clone());
        }
    }

    voices
        .iter()
        .find(|v| v.default)
        .or_else(|| voices.first())
        .map(|v| v.name.clone())
}
