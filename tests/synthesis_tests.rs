// Integration tests for the synthesis session
//
// These tests drive SynthesisSession through manually controlled scripted
// backends and verify the at-most-one-utterance invariant, voice
// selection and state convergence on errors and cancellation.

use nova_voice::speech::{
    ScriptedSynthesizer, SpeakingState, SynthesisSession, SynthesisSettings, SynthesizerEvent,
    VoiceInfo,
};
use std::time::Duration;

fn voice(name: &str, default: bool) -> VoiceInfo {
    VoiceInfo {
        name: name.to_string(),
        language: "en-US".to_string(),
        default,
    }
}

/// Poll until the condition holds or the timeout expires
async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if condition() {
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
async fn second_speak_replaces_the_first_utterance() {
    let (backend, log, mut handout) = ScriptedSynthesizer::manual(vec![voice("Standard", true)]);
    let session = SynthesisSession::new(Some(Box::new(backend)), SynthesisSettings::default());

    session.speak("first reply").await;
    let first = handout.next_utterance().await.expect("first submitted");

    first.send(SynthesizerEvent::Started).await.unwrap();
    assert!(wait_until(|| session.is_speaking()).await);

    // Replacing the utterance cancels the old one and drops the state
    session.speak("second reply").await;
    let second = handout.next_utterance().await.expect("second submitted");
    assert!(!session.is_speaking());

    // Late events from the replaced utterance are ignored (its receiver
    // may already be gone, so the sends themselves may fail)
    let _ = first.send(SynthesizerEvent::Started).await;
    let _ = first.send(SynthesizerEvent::Ended).await;
    settle().await;
    assert!(!session.is_speaking());

    second.send(SynthesizerEvent::Started).await.unwrap();
    assert!(wait_until(|| session.is_speaking()).await);
    second.send(SynthesizerEvent::Ended).await.unwrap();
    assert!(wait_until(|| !session.is_speaking()).await);

    // One cancel per speak call, both utterances submitted in order
    assert_eq!(log.cancel_count(), 2);
    let texts: Vec<String> = log.utterances().into_iter().map(|u| u.text).collect();
    assert_eq!(texts, vec!["first reply", "second reply"]);

    session.shutdown().await;
}

#[tokio::test]
async fn playback_error_never_leaves_state_stuck() {
    let (backend, _log, mut handout) = ScriptedSynthesizer::manual(vec![voice("Standard", true)]);
    let session = SynthesisSession::new(Some(Box::new(backend)), SynthesisSettings::default());

    session.speak("doomed reply").await;
    let utterance = handout.next_utterance().await.expect("submitted");

    utterance.send(SynthesizerEvent::Started).await.unwrap();
    assert!(wait_until(|| session.is_speaking()).await);

    utterance
        .send(SynthesizerEvent::Error {
            code: "interrupted".to_string(),
        })
        .await
        .unwrap();
    assert!(wait_until(|| !session.is_speaking()).await);
    assert_eq!(session.state(), SpeakingState::Idle);

    session.shutdown().await;
}

#[tokio::test]
async fn stop_goes_idle_without_waiting_for_the_host() {
    let (backend, log, mut handout) = ScriptedSynthesizer::manual(vec![voice("Standard", true)]);
    let session = SynthesisSession::new(Some(Box::new(backend)), SynthesisSettings::default());

    session.speak("long reply").await;
    let utterance = handout.next_utterance().await.expect("submitted");
    utterance.send(SynthesizerEvent::Started).await.unwrap();
    assert!(wait_until(|| session.is_speaking()).await);

    session.stop().await;
    assert!(!session.is_speaking());
    assert_eq!(log.cancel_count(), 2); // one from speak, one from stop

    // The host's late end must not flip anything back
    utterance.send(SynthesizerEvent::Ended).await.unwrap();
    settle().await;
    assert!(!session.is_speaking());

    session.shutdown().await;
}

#[tokio::test]
async fn preferred_voice_substring_wins() {
    let voices = vec![
        voice("Host Basic", true),
        voice("Google UK English Female", false),
    ];
    let (backend, log, _handout) = ScriptedSynthesizer::manual(voices);
    let session = SynthesisSession::new(Some(Box::new(backend)), SynthesisSettings::default());

    session.speak("hello").await;

    let utterances = log.utterances();
    assert_eq!(utterances.len(), 1);
    assert_eq!(
        utterances[0].voice.as_deref(),
        Some("Google UK English Female")
    );

    session.shutdown().await;
}

#[tokio::test]
async fn falls_back_to_host_default_voice() {
    let voices = vec![voice("Plain A", false), voice("Plain B", true)];
    let (backend, log, _handout) = ScriptedSynthesizer::manual(voices);
    let session = SynthesisSession::new(Some(Box::new(backend)), SynthesisSettings::default());

    session.speak("hello").await;

    assert_eq!(log.utterances()[0].voice.as_deref(), Some("Plain B"));

    session.shutdown().await;
}

#[tokio::test]
async fn empty_voice_list_uses_no_explicit_voice() {
    let (backend, log, _handout) = ScriptedSynthesizer::manual(vec![]);
    let session = SynthesisSession::new(Some(Box::new(backend)), SynthesisSettings::default());

    session.speak("hello").await;

    let utterances = log.utterances();
    assert_eq!(utterances.len(), 1);
    assert_eq!(utterances[0].voice, None);

    // Neutral playback parameters on every utterance
    assert_eq!(utterances[0].rate, 1.0);
    assert_eq!(utterances[0].pitch, 1.0);
    assert_eq!(utterances[0].volume, 1.0);

    session.shutdown().await;
}

#[tokio::test]
async fn empty_text_is_a_noop() {
    let (backend, log, _handout) = ScriptedSynthesizer::manual(vec![voice("Standard", true)]);
    let session = SynthesisSession::new(Some(Box::new(backend)), SynthesisSettings::default());

    session.speak("").await;

    assert!(log.utterances().is_empty());
    assert_eq!(log.cancel_count(), 0);

    session.shutdown().await;
}

#[tokio::test]
async fn shutdown_cancels_an_inflight_utterance() {
    let (backend, log, mut handout) = ScriptedSynthesizer::manual(vec![voice("Standard", true)]);
    let session = SynthesisSession::new(Some(Box::new(backend)), SynthesisSettings::default());

    session.speak("reply in flight").await;
    let utterance = handout.next_utterance().await.expect("submitted");
    utterance.send(SynthesizerEvent::Started).await.unwrap();
    assert!(wait_until(|| session.is_speaking()).await);

    session.shutdown().await;
    assert!(!session.is_speaking());
    assert_eq!(log.cancel_count(), 2); // one from speak, one from teardown

    // A late event cannot reach the aborted pump
    let _ = utterance.send(SynthesizerEvent::Started).await;
    settle().await;
    assert!(!session.is_speaking());
}

#[tokio::test]
async fn unsupported_session_noops_everything() {
    let session = SynthesisSession::new(None, SynthesisSettings::default());

    assert!(!session.is_supported());

    session.speak("hello").await;
    assert!(!session.is_speaking());

    session.stop().await;
    session.shutdown().await;
}
