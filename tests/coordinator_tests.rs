// End-to-end tests for the session coordinator
//
// A manually controlled recognizer plays the host role; the tests check
// message sequencing, advisory surfacing and the pending-reply policy.

use nova_voice::notify::{Notice, Notifier, Severity};
use nova_voice::speech::{
    RecognitionState, RecognizerEvent, RecognizerSettings, ResultFragment, ScriptedRecognizer,
    ScriptedSynthesizer, SynthesisSettings, VoiceInfo,
};
use nova_voice::{
    CoordinatorSettings, KeywordResponder, RecognitionSession, Role, SessionCoordinator,
    SynthesisSession,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Notifier that records every notice for later assertions
#[derive(Clone, Default)]
struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

fn test_voices() -> Vec<VoiceInfo> {
    vec![VoiceInfo {
        name: "Test Standard".to_string(),
        language: "en-US".to_string(),
        default: true,
    }]
}

fn settings(reply_delay_ms: u64) -> CoordinatorSettings {
    CoordinatorSettings {
        reply_delay: Duration::from_millis(reply_delay_ms),
    }
}

async fn wait_for_messages(coordinator: &SessionCoordinator, count: usize) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if coordinator.messages().await.len() >= count {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn full_turn_appends_both_messages_and_speaks_once() {
    let (recognizer, mut captures) = ScriptedRecognizer::manual();
    let (synthesizer, log) = ScriptedSynthesizer::auto(test_voices());
    let notifier = RecordingNotifier::default();

    let coordinator = SessionCoordinator::new(
        RecognitionSession::new(Some(Box::new(recognizer)), RecognizerSettings::default()),
        SynthesisSession::new(Some(Box::new(synthesizer)), SynthesisSettings::default()),
        Box::new(KeywordResponder::default()),
        Box::new(notifier.clone()),
        settings(50),
    );

    coordinator.toggle().await;
    let capture = captures.next_capture().await.expect("capture started");
    assert_eq!(coordinator.recognition_state(), RecognitionState::Listening);

    capture
        .send(RecognizerEvent::Result {
            first_changed: 0,
            fragments: vec![ResultFragment::final_text("hello")],
        })
        .await
        .unwrap();
    drop(capture); // host ends the capture

    // Exactly one user message, then one assistant message after the delay
    assert!(wait_for_messages(&coordinator, 2).await);
    settle().await;

    let messages = coordinator.messages().await;
    assert_eq!(messages.len(), 2);

    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "hello");
    assert!(messages[0].id.starts_with("user-"));

    assert_eq!(messages[1].role, Role::Assistant);
    assert!(messages[1].content.contains("Hello"));
    assert!(messages[1].id.starts_with("assistant-"));
    assert_ne!(messages[0].id, messages[1].id);
    assert!(messages[0].timestamp <= messages[1].timestamp);

    // Exactly one utterance, carrying the assistant reply
    let utterances = log.utterances();
    assert_eq!(utterances.len(), 1);
    assert_eq!(utterances[0].text, messages[1].content);

    assert!(notifier.notices().is_empty());

    coordinator.shutdown().await;
}

#[tokio::test]
async fn recognition_errors_surface_as_advisories_only() {
    let (recognizer, mut captures) = ScriptedRecognizer::manual();
    let (synthesizer, log) = ScriptedSynthesizer::auto(test_voices());
    let notifier = RecordingNotifier::default();

    let coordinator = SessionCoordinator::new(
        RecognitionSession::new(Some(Box::new(recognizer)), RecognizerSettings::default()),
        SynthesisSession::new(Some(Box::new(synthesizer)), SynthesisSettings::default()),
        Box::new(KeywordResponder::default()),
        Box::new(notifier.clone()),
        settings(20),
    );

    // First attempt: the friendlier "no-speech" mapping
    coordinator.toggle().await;
    let capture = captures.next_capture().await.expect("capture started");
    capture
        .send(RecognizerEvent::Error {
            code: "no-speech".to_string(),
        })
        .await
        .unwrap();
    drop(capture);
    settle().await;

    // Second attempt: any other code is shown verbatim
    coordinator.toggle().await;
    let capture = captures.next_capture().await.expect("second capture");
    capture
        .send(RecognizerEvent::Error {
            code: "not-allowed".to_string(),
        })
        .await
        .unwrap();
    drop(capture);
    settle().await;

    let notices = notifier.notices();
    assert_eq!(notices.len(), 2);

    assert_eq!(notices[0].title, "Speech Recognition Error");
    assert_eq!(notices[0].severity, Severity::Error);
    assert_eq!(notices[0].body, "No speech was detected. Please try again.");

    assert_eq!(notices[1].title, "Speech Recognition Error");
    assert_eq!(notices[1].body, "Error: not-allowed");

    // No messages and no utterances from failed turns
    assert!(coordinator.messages().await.is_empty());
    assert!(log.utterances().is_empty());

    coordinator.shutdown().await;
}

#[tokio::test]
async fn cancelled_turn_produces_no_messages() {
    let (recognizer, mut captures) = ScriptedRecognizer::manual();
    let (synthesizer, log) = ScriptedSynthesizer::auto(test_voices());

    let coordinator = SessionCoordinator::new(
        RecognitionSession::new(Some(Box::new(recognizer)), RecognizerSettings::default()),
        SynthesisSession::new(Some(Box::new(synthesizer)), SynthesisSettings::default()),
        Box::new(KeywordResponder::default()),
        Box::new(RecordingNotifier::default()),
        settings(20),
    );

    coordinator.toggle().await;
    let capture = captures.next_capture().await.expect("capture started");

    // Only an interim fragment arrives before the user cancels
    capture
        .send(RecognizerEvent::Result {
            first_changed: 0,
            fragments: vec![ResultFragment::interim_text("hel")],
        })
        .await
        .unwrap();
    settle().await;

    coordinator.toggle().await; // cancel
    assert_eq!(coordinator.recognition_state(), RecognitionState::Idle);

    drop(capture); // late host end
    settle().await;

    assert!(coordinator.messages().await.is_empty());
    assert!(log.utterances().is_empty());

    coordinator.shutdown().await;
}

#[tokio::test]
async fn new_turn_drops_a_pending_reply() {
    let (recognizer, mut captures) = ScriptedRecognizer::manual();
    let (synthesizer, log) = ScriptedSynthesizer::auto(test_voices());

    let coordinator = SessionCoordinator::new(
        RecognitionSession::new(Some(Box::new(recognizer)), RecognizerSettings::default()),
        SynthesisSession::new(Some(Box::new(synthesizer)), SynthesisSettings::default()),
        Box::new(KeywordResponder::default()),
        Box::new(RecordingNotifier::default()),
        settings(400),
    );

    // Turn 1 finalizes, but its reply is still pending
    coordinator.toggle().await;
    let capture = captures.next_capture().await.expect("capture started");
    capture
        .send(RecognizerEvent::Result {
            first_changed: 0,
            fragments: vec![ResultFragment::final_text("hello")],
        })
        .await
        .unwrap();
    drop(capture);
    assert!(wait_for_messages(&coordinator, 1).await);
    settle().await;

    // Starting a new turn before the reply fires drops it
    coordinator.toggle().await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(coordinator.messages().await.len(), 1);
    assert!(log.utterances().is_empty());

    // Turn 2 runs to completion
    let capture = captures.next_capture().await.expect("second capture");
    capture
        .send(RecognizerEvent::Result {
            first_changed: 0,
            fragments: vec![ResultFragment::final_text("what time is it")],
        })
        .await
        .unwrap();
    drop(capture);

    assert!(wait_for_messages(&coordinator, 3).await);
    let messages = coordinator.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content, "what time is it");
    assert_eq!(messages[2].role, Role::Assistant);
    assert!(messages[2].content.starts_with("The current time is"));

    assert_eq!(log.utterances().len(), 1);
    assert_eq!(log.utterances()[0].text, messages[2].content);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn turn_completes_without_synthesis_support() {
    let (recognizer, mut captures) = ScriptedRecognizer::manual();

    let coordinator = SessionCoordinator::new(
        RecognitionSession::new(Some(Box::new(recognizer)), RecognizerSettings::default()),
        SynthesisSession::new(None, SynthesisSettings::default()),
        Box::new(KeywordResponder::default()),
        Box::new(RecordingNotifier::default()),
        settings(20),
    );

    assert!(!coordinator.synthesis_supported());

    coordinator.toggle().await;
    let capture = captures.next_capture().await.expect("capture started");
    capture
        .send(RecognizerEvent::Result {
            first_changed: 0,
            fragments: vec![ResultFragment::final_text("hello")],
        })
        .await
        .unwrap();
    drop(capture);

    assert!(wait_for_messages(&coordinator, 2).await);
    assert_eq!(coordinator.messages().await.len(), 2);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn unsupported_recognition_disables_the_widget() {
    let coordinator = SessionCoordinator::new(
        RecognitionSession::new(None, RecognizerSettings::default()),
        SynthesisSession::new(None, SynthesisSettings::default()),
        Box::new(KeywordResponder::default()),
        Box::new(RecordingNotifier::default()),
        settings(20),
    );

    assert!(!coordinator.recognition_supported());

    // Toggling does nothing on an unsupported host
    coordinator.toggle().await;
    assert_eq!(coordinator.recognition_state(), RecognitionState::Idle);
    settle().await;
    assert!(coordinator.messages().await.is_empty());

    coordinator.shutdown().await;
}
