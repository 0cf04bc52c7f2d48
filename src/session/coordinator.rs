use crate::notify::{Notice, Notifier};
use crate::responder::ResponseGenerator;
use crate::speech::{
    RecognitionSession, RecognitionState, RecognitionUpdate, SpeakingState, SynthesisSession,
};
use crate::transcript::{Message, Role, Transcript};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Host error code that gets a friendlier advisory body
const NO_SPEECH_CODE: &str = "no-speech";

/// Coordinator tunables
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Pause between a finalized transcript and the generated reply
    pub reply_delay: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(500),
        }
    }
}

/// Owns the conversation transcript and sequences each voice turn
///
/// A turn runs listen -> user message -> delayed reply -> assistant
/// message -> spoken reply. Recognition errors surface as transient
/// advisories and never touch the transcript. A reply that has not fired
/// yet is dropped when a new listening turn begins.
pub struct SessionCoordinator {
    recognition: Arc<RecognitionSession>,
    synthesis: Arc<SynthesisSession>,
    transcript: Transcript,

    /// Pending delayed-reply task, shared with the update loop
    reply_task: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// Handle for the update loop
    run_handle: JoinHandle<()>,
}

impl SessionCoordinator {
    /// Wire the sessions together and start the update loop
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(
        mut recognition: RecognitionSession,
        synthesis: SynthesisSession,
        responder: Box<dyn ResponseGenerator>,
        notifier: Box<dyn Notifier>,
        settings: CoordinatorSettings,
    ) -> Self {
        let mut updates = recognition
            .take_updates()
            .unwrap_or_else(|| mpsc::channel(1).1);

        let recognition = Arc::new(recognition);
        let synthesis = Arc::new(synthesis);
        let transcript = Transcript::new();
        let reply_task: Arc<Mutex<Option<JoinHandle<()>>>> = Arc::new(Mutex::new(None));

        let responder: Arc<dyn ResponseGenerator> = Arc::from(responder);

        let run_handle = {
            let recognition = Arc::clone(&recognition);
            let synthesis = Arc::clone(&synthesis);
            let transcript = transcript.clone();
            let reply_task = Arc::clone(&reply_task);

            tokio::spawn(async move {
                while let Some(update) = updates.recv().await {
                    match update {
                        RecognitionUpdate::Ended => {
                            let heard = recognition.transcript().await;
                            if heard.is_empty() {
                                // Cancelled turn or silence: nothing to append
                                debug!("capture ended without a final transcript");
                                continue;
                            }

                            info!(content = %heard, "user message finalized");
                            transcript.push(Message::new(Role::User, &heard)).await;

                            let task = Self::spawn_reply(
                                heard,
                                Arc::clone(&synthesis),
                                transcript.clone(),
                                Arc::clone(&responder),
                                settings.reply_delay,
                            );

                            let mut pending = reply_task.lock().await;
                            if let Some(stale) = pending.replace(task) {
                                // A reply from an earlier turn that never fired
                                stale.abort();
                            }
                        }

                        RecognitionUpdate::Error { code } => {
                            warn!(code = %code, "surfacing recognition error");
                            let body = if code == NO_SPEECH_CODE {
                                "No speech was detected. Please try again.".to_string()
                            } else {
                                format!("Error: {code}")
                            };
                            notifier.notify(Notice::error("Speech Recognition Error", body));
                        }
                    }
                }

                debug!("update loop finished");
            })
        };

        Self {
            recognition,
            synthesis,
            transcript,
            reply_task,
            run_handle,
        }
    }

    /// Whether the host offers speech recognition
    pub fn recognition_supported(&self) -> bool {
        self.recognition.is_supported()
    }

    /// Whether the host offers speech synthesis
    pub fn synthesis_supported(&self) -> bool {
        self.synthesis.is_supported()
    }

    /// Current recognition state
    pub fn recognition_state(&self) -> RecognitionState {
        self.recognition.state()
    }

    /// Current synthesis state
    pub fn speaking_state(&self) -> SpeakingState {
        self.synthesis.state()
    }

    /// Snapshot of the conversation so far
    pub async fn messages(&self) -> Vec<Message> {
        self.transcript.messages().await
    }

    /// The single voice control: start listening when idle, stop when
    /// already listening
    ///
    /// Starting a new turn drops a reply still pending from the previous
    /// one.
    pub async fn toggle(&self) {
        match self.recognition.state() {
            RecognitionState::Listening => {
                debug!("toggle: stopping capture");
                self.recognition.stop().await;
            }
            RecognitionState::Idle => {
                debug!("toggle: starting capture");
                {
                    let mut pending = self.reply_task.lock().await;
                    if let Some(stale) = pending.take() {
                        stale.abort();
                    }
                }
                self.recognition.start().await;
            }
        }
    }

    /// Tear down the coordinator and both sessions on every exit path
    pub async fn shutdown(&self) {
        self.run_handle.abort();

        {
            let mut pending = self.reply_task.lock().await;
            if let Some(task) = pending.take() {
                task.abort();
            }
        }

        self.recognition.shutdown().await;
        self.synthesis.shutdown().await;

        info!("session coordinator shut down");
    }

    /// Generate and deliver the reply for one finalized user utterance
    fn spawn_reply(
        heard: String,
        synthesis: Arc<SynthesisSession>,
        transcript: Transcript,
        responder: Arc<dyn ResponseGenerator>,
        delay: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let reply = responder.generate(&heard);
            info!(content = %reply, "assistant message generated");
            transcript.push(Message::new(Role::Assistant, &reply)).await;

            if synthesis.is_supported() {
                synthesis.speak(&reply).await;
            }
        })
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.run_handle.abort();
        if let Ok(mut pending) = self.reply_task.try_lock() {
            if let Some(task) = pending.take() {
                task.abort();
            }
        }
    }
}
