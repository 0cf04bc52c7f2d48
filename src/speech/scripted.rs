//! Scripted speech backends
//!
//! In-memory implementations of the host capability traits, driven by a
//! declarative script. Used by the integration tests and the demo binary
//! in place of a real platform speech engine.

use super::backend::{
    CapabilityProvider, RecognizerBackend, RecognizerEvent, RecognizerSettings, ResultFragment,
    SynthesizerBackend, SynthesizerEvent, UtteranceRequest, VoiceInfo,
};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Channel capacity for scripted event streams
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// One scripted capture attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedUtterance {
    /// Text the recognizer "hears" (delivered as interim, then final)
    #[serde(default)]
    pub text: String,

    /// Deliver this error code instead of a transcript
    #[serde(default)]
    pub error: Option<String>,
}

impl ScriptedUtterance {
    /// A capture that finalizes the given text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: None,
        }
    }

    /// A capture that fails with the given host error code
    pub fn error(code: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            error: Some(code.into()),
        }
    }
}

enum RecognizerMode {
    /// Play back one scripted utterance per capture attempt
    Scripted {
        utterances: VecDeque<ScriptedUtterance>,
        event_delay: Duration,
    },
    /// Hand each capture attempt's event sender to the test
    Manual {
        handout: mpsc::UnboundedSender<mpsc::Sender<RecognizerEvent>>,
    },
    /// Fail synchronously on every start
    Unavailable,
}

/// Scripted host speech-to-text capability
pub struct ScriptedRecognizer {
    mode: RecognizerMode,
    feed_handle: Option<JoinHandle<()>>,
}

/// Per-capture event senders handed out by a manual recognizer
pub struct CaptureHandout {
    handout: mpsc::UnboundedReceiver<mpsc::Sender<RecognizerEvent>>,
}

impl CaptureHandout {
    /// Wait for the next capture attempt and take control of its events
    pub async fn next_capture(&mut self) -> Option<mpsc::Sender<RecognizerEvent>> {
        self.handout.recv().await
    }
}

impl ScriptedRecognizer {
    /// Recognizer that plays back the given utterances, one per start
    pub fn scripted(utterances: Vec<ScriptedUtterance>) -> Self {
        Self {
            mode: RecognizerMode::Scripted {
                utterances: utterances.into(),
                event_delay: Duration::from_millis(10),
            },
            feed_handle: None,
        }
    }

    /// Recognizer whose event streams are driven directly by the caller
    pub fn manual() -> (Self, CaptureHandout) {
        let (handout_tx, handout_rx) = mpsc::unbounded_channel();
        (
            Self {
                mode: RecognizerMode::Manual { handout: handout_tx },
                feed_handle: None,
            },
            CaptureHandout {
                handout: handout_rx,
            },
        )
    }

    /// Recognizer that fails synchronously on every start
    pub fn unavailable() -> Self {
        Self {
            mode: RecognizerMode::Unavailable,
            feed_handle: None,
        }
    }
}

#[async_trait::async_trait]
impl RecognizerBackend for ScriptedRecognizer {
    async fn start(&mut self, _settings: &RecognizerSettings) -> Result<mpsc::Receiver<RecognizerEvent>> {
        match &mut self.mode {
            RecognizerMode::Unavailable => {
                bail!("recognition unavailable")
            }

            RecognizerMode::Manual { handout } => {
                let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
                if handout.send(tx).is_err() {
                    bail!("capture handout dropped");
                }
                Ok(rx)
            }

            RecognizerMode::Scripted {
                utterances,
                event_delay,
            } => {
                let Some(utterance) = utterances.pop_front() else {
                    bail!("script exhausted");
                };
                let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
                let delay = *event_delay;

                self.feed_handle = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;

                    if let Some(code) = utterance.error {
                        let _ = tx.send(RecognizerEvent::Error { code }).await;
                    } else {
                        // An interim preview followed by the committed text
                        let _ = tx
                            .send(RecognizerEvent::Result {
                                first_changed: 0,
                                fragments: vec![ResultFragment::interim_text(&utterance.text)],
                            })
                            .await;
                        tokio::time::sleep(delay).await;
                        let _ = tx
                            .send(RecognizerEvent::Result {
                                first_changed: 0,
                                fragments: vec![ResultFragment::final_text(&utterance.text)],
                            })
                            .await;
                    }

                    tokio::time::sleep(delay).await;
                    let _ = tx.send(RecognizerEvent::End).await;
                }));

                Ok(rx)
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        // Aborting the feed drops its sender, which ends the event stream
        if let Some(feed) = self.feed_handle.take() {
            feed.abort();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted-recognizer"
    }
}

/// Shared record of what a scripted synthesizer was asked to do
#[derive(Clone, Default)]
pub struct SynthesizerLog {
    utterances: Arc<Mutex<Vec<UtteranceRequest>>>,
    cancels: Arc<AtomicUsize>,
}

impl SynthesizerLog {
    /// Every utterance submitted so far, in order
    pub fn utterances(&self) -> Vec<UtteranceRequest> {
        self.utterances.lock().expect("log lock poisoned").clone()
    }

    /// Number of cancel calls observed
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    fn record(&self, utterance: UtteranceRequest) {
        self.utterances
            .lock()
            .expect("log lock poisoned")
            .push(utterance);
    }

    fn record_cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

enum SynthesizerMode {
    /// Play each utterance automatically (Started, then Ended)
    Auto { event_delay: Duration },
    /// Hand each utterance's event sender to the test
    Manual {
        handout: mpsc::UnboundedSender<mpsc::Sender<SynthesizerEvent>>,
    },
}

/// Scripted host text-to-speech capability
pub struct ScriptedSynthesizer {
    voices: Vec<VoiceInfo>,
    mode: SynthesizerMode,
    log: SynthesizerLog,
    feed_handle: Option<JoinHandle<()>>,
}

/// Per-utterance event senders handed out by a manual synthesizer
pub struct UtteranceHandout {
    handout: mpsc::UnboundedReceiver<mpsc::Sender<SynthesizerEvent>>,
}

impl UtteranceHandout {
    /// Wait for the next submitted utterance and take control of its events
    pub async fn next_utterance(&mut self) -> Option<mpsc::Sender<SynthesizerEvent>> {
        self.handout.recv().await
    }
}

impl ScriptedSynthesizer {
    /// Synthesizer that plays every utterance to completion on its own
    pub fn auto(voices: Vec<VoiceInfo>) -> (Self, SynthesizerLog) {
        let log = SynthesizerLog::default();
        (
            Self {
                voices,
                mode: SynthesizerMode::Auto {
                    event_delay: Duration::from_millis(10),
                },
                log: log.clone(),
                feed_handle: None,
            },
            log,
        )
    }

    /// Synthesizer whose utterance events are driven by the caller
    pub fn manual(voices: Vec<VoiceInfo>) -> (Self, SynthesizerLog, UtteranceHandout) {
        let log = SynthesizerLog::default();
        let (handout_tx, handout_rx) = mpsc::unbounded_channel();
        (
            Self {
                voices,
                mode: SynthesizerMode::Manual { handout: handout_tx },
                log: log.clone(),
                feed_handle: None,
            },
            log,
            UtteranceHandout {
                handout: handout_rx,
            },
        )
    }
}

#[async_trait::async_trait]
impl SynthesizerBackend for ScriptedSynthesizer {
    async fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    async fn speak(&mut self, utterance: UtteranceRequest) -> Result<mpsc::Receiver<SynthesizerEvent>> {
        self.log.record(utterance);

        match &self.mode {
            SynthesizerMode::Manual { handout } => {
                let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
                if handout.send(tx).is_err() {
                    bail!("utterance handout dropped");
                }
                Ok(rx)
            }

            SynthesizerMode::Auto { event_delay } => {
                let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
                let delay = *event_delay;

                self.feed_handle = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(SynthesizerEvent::Started).await;
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(SynthesizerEvent::Ended).await;
                }));

                Ok(rx)
            }
        }
    }

    async fn cancel(&mut self) -> Result<()> {
        self.log.record_cancel();
        // Aborting the feed drops its sender, which ends the event stream
        if let Some(feed) = self.feed_handle.take() {
            feed.abort();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted-synthesizer"
    }
}

/// Capability provider over pre-built scripted backends
///
/// Hands each backend out once; a missing backend models an unsupported
/// capability.
pub struct ScriptedProvider {
    recognizer: Mutex<Option<Box<dyn RecognizerBackend>>>,
    synthesizer: Mutex<Option<Box<dyn SynthesizerBackend>>>,
}

impl ScriptedProvider {
    /// Provider over the given backends (None = unsupported)
    pub fn new(
        recognizer: Option<Box<dyn RecognizerBackend>>,
        synthesizer: Option<Box<dyn SynthesizerBackend>>,
    ) -> Self {
        Self {
            recognizer: Mutex::new(recognizer),
            synthesizer: Mutex::new(synthesizer),
        }
    }

    /// Provider with neither capability, for fallback-path testing
    pub fn unsupported() -> Self {
        Self::new(None, None)
    }
}

impl CapabilityProvider for ScriptedProvider {
    fn recognizer(&self) -> Option<Box<dyn RecognizerBackend>> {
        self.recognizer.lock().expect("provider lock poisoned").take()
    }

    fn synthesizer(&self) -> Option<Box<dyn SynthesizerBackend>> {
        self.synthesizer.lock().expect("provider lock poisoned").take()
    }
}
