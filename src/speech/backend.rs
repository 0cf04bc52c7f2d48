use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A single recognition alternative for one fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentAlternative {
    /// Recognized text
    pub transcript: String,
    /// Confidence score (0.0 to 1.0), if the host reports one
    pub confidence: Option<f32>,
}

/// One result fragment delivered by the host recognizer
///
/// A fragment carries one or more alternatives; only the first alternative
/// is consumed. Interim fragments (`is_final == false`) may be revised by
/// later notifications, final fragments will not change again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFragment {
    /// Candidate transcriptions, best first
    pub alternatives: Vec<FragmentAlternative>,
    /// Whether the host has committed to this fragment
    pub is_final: bool,
}

impl ResultFragment {
    /// Build a final fragment with a single alternative
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            alternatives: vec![FragmentAlternative {
                transcript: text.into(),
                confidence: None,
            }],
            is_final: true,
        }
    }

    /// Build an interim fragment with a single alternative
    pub fn interim_text(text: impl Into<String>) -> Self {
        Self {
            alternatives: vec![FragmentAlternative {
                transcript: text.into(),
                confidence: None,
            }],
            is_final: false,
        }
    }
}

/// Event delivered by the host speech-to-text capability
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// New or revised fragments for the current utterance
    ///
    /// `fragments` is the host's full fragment list for the utterance;
    /// `first_changed` is the index of the first fragment that changed in
    /// this notification. Fragments before it were delivered unchanged in
    /// an earlier notification.
    Result {
        first_changed: usize,
        fragments: Vec<ResultFragment>,
    },

    /// The host reported a recognition failure (e.g. "no-speech",
    /// "audio-capture", "not-allowed")
    Error { code: String },

    /// The capture ended on the host side (explicit stop or silence
    /// timeout). Closing the event channel is equivalent.
    End,
}

/// Settings applied to the host recognizer at session construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerSettings {
    /// Keep capturing after the first utterance completes
    pub continuous: bool,
    /// Deliver interim (revisable) fragments
    pub interim_results: bool,
    /// Recognition locale (e.g. "en-US")
    pub language: String,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            continuous: false,       // single-utterance mode
            interim_results: true,   // needed to detect finalization
            language: "en-US".to_string(),
        }
    }
}

/// Host speech-to-text capability
///
/// Implementations bridge a platform speech engine (or a scripted test
/// double) into a start/stop contract with an event stream per capture
/// attempt.
#[async_trait::async_trait]
pub trait RecognizerBackend: Send + Sync {
    /// Begin capturing one utterance with the given settings
    ///
    /// Returns a receiver for this attempt's events. A synchronous host
    /// failure (permission denied, capture already running) is the error
    /// arm; no events follow it.
    async fn start(&mut self, settings: &RecognizerSettings) -> Result<mpsc::Receiver<RecognizerEvent>>;

    /// Request the host to stop capturing
    ///
    /// The host acknowledges asynchronously by delivering `End` (or by
    /// closing the event channel); callers must not wait for it.
    async fn stop(&mut self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// A voice offered by the host synthesizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Host-assigned voice name
    pub name: String,
    /// Voice locale (e.g. "en-US")
    pub language: String,
    /// Whether the host considers this its default voice
    pub default: bool,
}

/// One text-to-speech playback request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtteranceRequest {
    /// Text to speak
    pub text: String,
    /// Speech rate (1.0 = neutral)
    pub rate: f32,
    /// Voice pitch (1.0 = neutral)
    pub pitch: f32,
    /// Playback volume (1.0 = full)
    pub volume: f32,
    /// Explicit voice name, or None for the host default
    pub voice: Option<String>,
}

/// Event delivered by the host text-to-speech capability
#[derive(Debug, Clone)]
pub enum SynthesizerEvent {
    /// Playback of the utterance began
    Started,
    /// Playback finished normally
    Ended,
    /// Playback failed or was interrupted by the host
    Error { code: String },
}

/// Host text-to-speech capability
#[async_trait::async_trait]
pub trait SynthesizerBackend: Send + Sync {
    /// Voices currently offered by the host
    ///
    /// May be empty before the host has populated its registry; callers
    /// must tolerate an empty list.
    async fn voices(&self) -> Vec<VoiceInfo>;

    /// Queue an utterance for playback
    ///
    /// Returns a receiver for this utterance's lifecycle events. Closing
    /// the channel without `Started` means the utterance was dropped.
    async fn speak(&mut self, utterance: UtteranceRequest) -> Result<mpsc::Receiver<SynthesizerEvent>>;

    /// Cancel any queued or playing utterance
    async fn cancel(&mut self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Source of host speech capabilities
///
/// Passed into the session constructors instead of any ambient global, so
/// the coordination logic can run against test doubles. `None` means the
/// capability is not supported on this host; sessions built from it report
/// `is_supported() == false` and no-op every operation.
pub trait CapabilityProvider: Send + Sync {
    /// Speech-to-text capability, if the host has one
    fn recognizer(&self) -> Option<Box<dyn RecognizerBackend>>;

    /// Text-to-speech capability, if the host has one
    fn synthesizer(&self) -> Option<Box<dyn SynthesizerBackend>>;
}
