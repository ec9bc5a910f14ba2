//! Integration tests for the call session state machine
//!
//! Drives full call lifecycles against mock collaborators under a paused
//! clock: greeting, listening cycles, round-trips, mute, hang-up races,
//! and the duration counter.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use bima_agent::{CallConfig, CallEvent, CallSession, CallStatus};
use bima_core::{
    AudioFrame, ChatCompletion, ChatMessage, Channels, Language, Result, SampleRate, Speaker,
    Synthesizer, Transcriber, UtterancePayload,
};
use bima_pipeline::{CaptureDevice, ChannelDevice, DeniedDevice, PacedSynthesizer};

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

struct MockTranscriber {
    text: &'static str,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockTranscriber {
    fn instant(text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            text,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(text: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            text,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _payload: &UtterancePayload) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.text.to_string())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockChat {
    reply: &'static str,
}

impl MockChat {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self { reply })
    }
}

#[async_trait]
impl ChatCompletion for MockChat {
    async fn complete(&self, _system: &str, _history: &[ChatMessage]) -> Result<String> {
        Ok(self.reply.to_string())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

struct InstantSynthesizer;

#[async_trait]
impl Synthesizer for InstantSynthesizer {
    async fn speak(&self, _text: &str, _language: Language) -> Result<()> {
        Ok(())
    }

    fn cancel(&self) {}

    fn name(&self) -> &str {
        "instant"
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn speech_frame(samples: usize, level: f32) -> AudioFrame {
    AudioFrame::new(vec![level; samples], SampleRate::Hz16000, Channels::Mono, 0)
}

/// Feed frames 20ms apart (the capture chunk cadence)
async fn feed(device: &ChannelDevice, frames: usize, samples: usize, level: f32) {
    for _ in 0..frames {
        device.feed(speech_frame(samples, level));
        tokio::time::advance(Duration::from_millis(20)).await;
        tokio::task::yield_now().await;
    }
}

async fn next_event(rx: &mut broadcast::Receiver<CallEvent>) -> CallEvent {
    tokio::time::timeout(Duration::from_secs(60), rx.recv())
        .await
        .expect("timed out waiting for call event")
        .expect("event channel closed")
}

/// Skip events until one matches the predicate
async fn wait_for<F>(rx: &mut broadcast::Receiver<CallEvent>, mut pred: F) -> CallEvent
where
    F: FnMut(&CallEvent) -> bool,
{
    loop {
        let event = next_event(rx).await;
        if pred(&event) {
            return event;
        }
    }
}

fn assert_exclusive(session: &CallSession) {
    let snap = session.snapshot();
    assert!(
        !(snap.speaking && snap.listening),
        "speaking and listening must be mutually exclusive: {snap:?}"
    );
    if snap.muted {
        assert!(!snap.listening, "mute must force listening off: {snap:?}");
    }
}

fn build_session(
    transcriber: Arc<MockTranscriber>,
    synthesizer: Arc<dyn Synthesizer>,
    config: CallConfig,
) -> (CallSession, Arc<ChannelDevice>) {
    let device = ChannelDevice::new();
    let session = CallSession::new(
        "test-call",
        config,
        MockChat::new("PMFBY is the national crop insurance scheme."),
        transcriber,
        synthesizer,
        device.clone() as Arc<dyn CaptureDevice>,
    );
    (session, device)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Full happy path: start → greeting → user utterance → reply → re-arm
#[tokio::test(start_paused = true)]
async fn test_call_lifecycle_and_round_trip() {
    let transcriber = MockTranscriber::instant("What is PMFBY?");
    let (session, device) = build_session(
        transcriber.clone(),
        Arc::new(InstantSynthesizer),
        CallConfig::default(),
    );
    let mut rx = session.subscribe();

    assert_eq!(session.status(), CallStatus::Idle);
    session.start_call();

    wait_for(&mut rx, |e| {
        matches!(e, CallEvent::StatusChanged { new: CallStatus::Connecting, .. })
    })
    .await;

    // Connect delay elapses under the paused clock
    wait_for(&mut rx, |e| {
        matches!(e, CallEvent::StatusChanged { new: CallStatus::Active, .. })
    })
    .await;

    // Exactly one agent greeting turn, spoken before listening arms
    let greeting = wait_for(&mut rx, |e| matches!(e, CallEvent::TurnAdded(_))).await;
    if let CallEvent::TurnAdded(turn) = greeting {
        assert_eq!(turn.speaker, Speaker::Agent);
        assert_eq!(turn.text, Language::English.greeting());
    }
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;
    assert_exclusive(&session);

    // 800ms of speech, then a full silence window
    feed(&device, 40, 320, 0.5).await;
    feed(&device, 90, 320, 0.0).await;

    let user = wait_for(&mut rx, |e| matches!(e, CallEvent::TurnAdded(_))).await;
    if let CallEvent::TurnAdded(turn) = user {
        assert_eq!(turn.speaker, Speaker::User);
        assert_eq!(turn.text, "What is PMFBY?");
    }

    let agent = wait_for(&mut rx, |e| matches!(e, CallEvent::TurnAdded(_))).await;
    if let CallEvent::TurnAdded(turn) = agent {
        assert_eq!(turn.speaker, Speaker::Agent);
    }

    // Reply spoken, then listening re-arms for the next turn
    wait_for(&mut rx, |e| matches!(e, CallEvent::SpeakingEnded)).await;
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;
    assert_exclusive(&session);

    let turns = session.turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].speaker, Speaker::Agent);
    assert_eq!(turns[1].speaker, Speaker::User);
    assert_eq!(turns[2].speaker, Speaker::Agent);
    assert!(turns[0].id < turns[1].id && turns[1].id < turns[2].id);

    assert_eq!(transcriber.call_count(), 1);
    assert_eq!(session.status(), CallStatus::Active);
}

/// Payloads under the byte floor produce no transcription call and no turn
#[tokio::test(start_paused = true)]
async fn test_tiny_payload_discarded() {
    let transcriber = MockTranscriber::instant("should never appear");
    let (session, device) = build_session(
        transcriber.clone(),
        Arc::new(InstantSynthesizer),
        CallConfig::default(),
    );
    let mut rx = session.subscribe();

    session.start_call();
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;

    // Two-sample frames keep the WAV payload well under 1000 bytes while
    // still driving the VAD through a full speech + silence cycle
    feed(&device, 40, 2, 0.5).await;
    feed(&device, 90, 2, 0.0).await;

    // Cycle completes and re-arms without a round trip
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStopped)).await;
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;

    assert_eq!(transcriber.call_count(), 0);
    assert_eq!(session.turns().len(), 1); // greeting only
}

/// Mute stops capture immediately; unmute while not speaking re-arms
/// listening
#[tokio::test(start_paused = true)]
async fn test_mute_suppresses_listening() {
    let transcriber = MockTranscriber::instant("hello");
    let (session, device) = build_session(
        transcriber.clone(),
        Arc::new(InstantSynthesizer),
        CallConfig::default(),
    );
    let mut rx = session.subscribe();

    session.start_call();
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;
    assert!(device.is_open());

    session.toggle_mute(true);
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStopped)).await;

    // Let the capture cycle wind down, then verify the device is closed
    tokio::time::advance(Duration::from_millis(50)).await;
    tokio::task::yield_now().await;
    assert!(!device.is_open(), "mute must stop in-flight capture");

    let snap = session.snapshot();
    assert!(snap.muted && !snap.listening);
    assert_exclusive(&session);

    session.toggle_mute(false);
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;
    assert!(session.snapshot().listening);
}

/// Unmuting while the agent is speaking defers re-arm until speech ends
#[tokio::test(start_paused = true)]
async fn test_unmute_during_speaking_defers_rearm() {
    let transcriber = MockTranscriber::instant("hello");
    // Slow synthesizer: the greeting takes many seconds of paused time
    let (session, _device) = build_session(
        transcriber,
        Arc::new(PacedSynthesizer::new(60)),
        CallConfig::default(),
    );
    let mut rx = session.subscribe();

    session.start_call();
    wait_for(&mut rx, |e| matches!(e, CallEvent::SpeakingStarted { .. })).await;
    assert!(session.snapshot().speaking);

    session.toggle_mute(true);
    session.toggle_mute(false);
    assert_exclusive(&session);

    // No listening until the greeting finishes
    let mut saw_listening_before_speech_end = false;
    loop {
        match next_event(&mut rx).await {
            CallEvent::ListeningStarted => {
                saw_listening_before_speech_end = true;
                break;
            },
            CallEvent::SpeakingEnded => break,
            _ => {},
        }
    }
    assert!(
        !saw_listening_before_speech_end,
        "listening must not re-arm while speaking"
    );

    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;
    assert_exclusive(&session);
}

/// The duration counter ticks once per second while active, is frozen on
/// hang-up, and resets only on a fresh start
#[tokio::test(start_paused = true)]
async fn test_duration_monotonic_frozen_and_reset() {
    let transcriber = MockTranscriber::instant("hello");
    let (session, _device) = build_session(
        transcriber,
        Arc::new(InstantSynthesizer),
        CallConfig::default(),
    );
    let mut rx = session.subscribe();

    session.start_call();

    // Ticks arrive strictly in order under the paused clock
    let mut expected = 1;
    while expected <= 5 {
        let event = wait_for(&mut rx, |e| matches!(e, CallEvent::DurationTick { .. })).await;
        if let CallEvent::DurationTick { seconds } = event {
            assert_eq!(seconds, expected, "duration must increase by exactly 1");
            expected += 1;
        }
    }
    assert_eq!(session.snapshot().duration_seconds, 5);

    session.end_call();
    assert_eq!(session.status(), CallStatus::Ended);

    // Frozen, not reset, after the call leaves Active
    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    assert_eq!(session.snapshot().duration_seconds, 5);
    assert_eq!(session.snapshot().formatted_duration, "00:05");

    // A fresh start resets to zero
    session.start_call();
    wait_for(&mut rx, |e| {
        matches!(e, CallEvent::StatusChanged { new: CallStatus::Active, .. })
    })
    .await;
    assert!(session.snapshot().duration_seconds <= 1);
}

/// A round-trip result resolving after hang-up appends no turn and leaves
/// the session Ended
#[tokio::test(start_paused = true)]
async fn test_end_call_discards_in_flight_round_trip() {
    let transcriber = MockTranscriber::slow("late transcript", Duration::from_secs(5));
    let (session, device) = build_session(
        transcriber.clone(),
        Arc::new(InstantSynthesizer),
        CallConfig::default(),
    );
    let mut rx = session.subscribe();

    session.start_call();
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;

    // Complete an utterance so the round trip starts
    feed(&device, 40, 320, 0.5).await;
    feed(&device, 90, 320, 0.0).await;
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStopped)).await;

    // Give the loop a few schedule points to enter the transcription await
    for _ in 0..10 {
        tokio::task::yield_now().await;
        if transcriber.call_count() == 1 {
            break;
        }
    }
    assert_eq!(transcriber.call_count(), 1);
    let turns_before = session.turns().len();

    // Hang up while transcription is in flight
    session.end_call();
    assert_eq!(session.status(), CallStatus::Ended);

    // Let the stale transcription resolve
    tokio::time::advance(Duration::from_secs(6)).await;
    tokio::task::yield_now().await;

    assert_eq!(session.turns().len(), turns_before, "no turn after hang-up");
    assert_eq!(session.status(), CallStatus::Ended);
    assert!(!session.snapshot().listening);
}

/// A denied microphone does not crash the session; the call stays in a
/// well-defined Active state with listening off
#[tokio::test(start_paused = true)]
async fn test_permission_denied_is_survivable() {
    let config = CallConfig {
        surface_turn_errors: true,
        ..Default::default()
    };
    let session = CallSession::new(
        "denied-call",
        config,
        MockChat::new("unused"),
        MockTranscriber::instant("unused"),
        Arc::new(InstantSynthesizer),
        Arc::new(DeniedDevice),
    );
    let mut rx = session.subscribe();

    session.start_call();
    wait_for(&mut rx, |e| {
        matches!(e, CallEvent::StatusChanged { new: CallStatus::Active, .. })
    })
    .await;

    // Capture failure surfaces as a localized error event
    let event = wait_for(&mut rx, |e| matches!(e, CallEvent::Error { .. })).await;
    if let CallEvent::Error { message } = event {
        assert!(!message.is_empty());
    }

    assert_eq!(session.status(), CallStatus::Active);
    assert!(!session.snapshot().listening);
}

/// Restarting after hang-up behaves like a fresh call
#[tokio::test(start_paused = true)]
async fn test_restart_is_fresh() {
    let transcriber = MockTranscriber::instant("hello");
    let (session, _device) = build_session(
        transcriber,
        Arc::new(InstantSynthesizer),
        CallConfig::default(),
    );
    let mut rx = session.subscribe();

    session.start_call();
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;
    session.end_call();

    session.start_call();
    wait_for(&mut rx, |e| {
        matches!(e, CallEvent::StatusChanged { new: CallStatus::Active, .. })
    })
    .await;
    wait_for(&mut rx, |e| matches!(e, CallEvent::ListeningStarted)).await;

    // Only the fresh greeting in the transcript
    let turns = session.turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].id, 0);
    assert_eq!(turns[0].speaker, Speaker::Agent);
}
