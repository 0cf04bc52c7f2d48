//! Speech capability wrappers
//!
//! This module bridges the host's speech-to-text and text-to-speech
//! capabilities into narrow session contracts:
//! - `RecognitionSession`: start/stop capture, accumulated transcript,
//!   last error
//! - `SynthesisSession`: speak/stop with at most one active utterance
//! - backend traits + scripted implementations for tests and demos

pub mod backend;
pub mod recognition;
pub mod scripted;
pub mod synthesis;

pub use backend::{
    CapabilityProvider, FragmentAlternative, RecognizerBackend, RecognizerEvent,
    RecognizerSettings, ResultFragment, SynthesizerBackend, SynthesizerEvent, UtteranceRequest,
    VoiceInfo,
};
pub use recognition::{RecognitionSession, RecognitionState, RecognitionUpdate};
pub use scripted::{
    CaptureHandout, ScriptedProvider, ScriptedRecognizer, ScriptedSynthesizer, ScriptedUtterance,
    SynthesizerLog, UtteranceHandout,
};
pub use synthesis::{SpeakingState, SynthesisSession, SynthesisSettings};
