pub mod config;
pub mod notify;
pub mod responder;
pub mod session;
pub mod speech;
pub mod transcript;

pub use config::Config;
pub use notify::{Notice, Notifier, Severity, TracingNotifier};
pub use responder::{KeywordResponder, ResponseGenerator, JOKES};
pub use session::{CoordinatorSettings, SessionCoordinator};
pub use speech::{
    CapabilityProvider, RecognitionSession, RecognitionState, RecognitionUpdate,
    RecognizerBackend, RecognizerEvent, RecognizerSettings, ResultFragment, SpeakingState,
    SynthesisSession, SynthesisSettings, SynthesizerBackend, SynthesizerEvent, UtteranceRequest,
    VoiceInfo,
};
pub use transcript::{Message, Role, Transcript};
