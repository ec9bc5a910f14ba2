//! Call session controller
//!
//! Top-level state machine for one voice call:
//!
//! ```text
//! Idle ──start_call──▶ Connecting ──(connect delay + greeting)──▶ Active ──end_call──▶ Ended
//!                                                                  │
//!                                             Listening ⇄ Speaking (never both)
//! ```
//!
//! One listening cycle at a time: capture → VAD → recorder → transcription
//! → completion → synthesis, then re-arm — unless the session was muted or
//! ended in the interim. Asynchronous results are applied only after a
//! generation check, so anything resolving after hang-up is discarded.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use bima_config::Settings;
use bima_core::{
    ChatCompletion, Error, Language, Synthesizer, Transcriber, Turn, UtterancePayload,
};
use bima_pipeline::{
    AudioCapture, CaptureDevice, UtteranceRecorder, VadConfig, VadEvent, VoiceActivityDetector,
};

use crate::engine::ConversationEngine;

/// Event channel capacity; slow subscribers lag rather than block the call
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Call session configuration
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Language of the greeting, prompts, and synthesis
    pub language: Language,
    /// VAD tuning
    pub vad: VadConfig,
    /// Simulated connect delay before the call goes active
    pub connect_delay: Duration,
    /// Utterance payloads under this size are discarded as noise (bytes)
    pub min_payload_bytes: usize,
    /// Emit a user-visible error event when a mid-call round-trip fails
    pub surface_turn_errors: bool,
}

impl Default for CallConfig {
    fn default() -> Self {
        use bima_config::constants::{call, recorder};
        Self {
            language: Language::default(),
            vad: VadConfig::default(),
            connect_delay: Duration::from_millis(call::CONNECT_DELAY_MS),
            min_payload_bytes: recorder::MIN_PAYLOAD_BYTES,
            surface_turn_errors: false,
        }
    }
}

impl CallConfig {
    /// Build from settings, with an optional per-session language override
    pub fn from_settings(settings: &Settings, language: Option<Language>) -> Self {
        Self {
            language: language.unwrap_or(settings.call.default_language),
            vad: VadConfig {
                silence_threshold: settings.vad.silence_threshold,
                min_recording: Duration::from_millis(settings.vad.min_recording_ms),
                silence_duration: Duration::from_millis(settings.vad.silence_duration_ms),
            },
            connect_delay: Duration::from_millis(settings.call.connect_delay_ms),
            min_payload_bytes: settings.transcription.min_payload_bytes,
            surface_turn_errors: settings.call.surface_turn_errors,
        }
    }
}

/// Call lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Idle,
    Connecting,
    Active,
    Ended,
}

/// Events emitted over the session's broadcast channel
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// Lifecycle transition
    StatusChanged { old: CallStatus, new: CallStatus },
    /// A turn was appended to the transcript
    TurnAdded(Turn),
    /// Capture armed for the next user utterance
    ListeningStarted,
    /// Capture stopped (utterance finalized, mute, or hang-up)
    ListeningStopped,
    /// Agent speech started
    SpeakingStarted { text: String },
    /// Agent speech finished or was cancelled
    SpeakingEnded,
    /// Duration counter advanced (once per second while active)
    DurationTick { seconds: u64 },
    /// Localized, user-visible failure message (only when configured)
    Error { message: String },
}

/// Point-in-time view of the session for status endpoints
#[derive(Debug, Clone, serde::Serialize)]
pub struct CallSnapshot {
    pub status: CallStatus,
    pub muted: bool,
    pub speaking: bool,
    pub listening: bool,
    pub duration_seconds: u64,
    pub formatted_duration: String,
    pub turn_count: usize,
}

/// Mutable session state behind one lock
///
/// Invariants (enforced at the mutation points below):
/// - `speaking && listening` is never true
/// - `muted` forces `listening == false`
/// - `duration_seconds` advances only while status is Active
#[derive(Debug)]
struct Flags {
    status: CallStatus,
    muted: bool,
    speaking: bool,
    listening: bool,
    duration_seconds: u64,
    /// Bumped on every start/end/reset; stale async results are discarded
    /// when their generation no longer matches
    generation: u64,
}

/// One voice-call session
///
/// Cheap to clone; clones share the same underlying call.
#[derive(Clone)]
pub struct CallSession {
    inner: Arc<CallInner>,
}

struct CallInner {
    id: String,
    config: CallConfig,
    engine: Arc<ConversationEngine>,
    capture: AudioCapture,
    transcriber: Arc<dyn Transcriber>,
    synthesizer: Arc<dyn Synthesizer>,
    flags: RwLock<Flags>,
    event_tx: broadcast::Sender<CallEvent>,
    /// Fired on mute and hang-up to break an in-flight capture cycle
    interrupt_tx: broadcast::Sender<()>,
    /// At most one listen loop may run at a time
    listen_loop_live: AtomicBool,
}

impl CallSession {
    pub fn new(
        id: impl Into<String>,
        config: CallConfig,
        chat: Arc<dyn ChatCompletion>,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn Synthesizer>,
        device: Arc<dyn CaptureDevice>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (interrupt_tx, _) = broadcast::channel(4);

        Self {
            inner: Arc::new(CallInner {
                id: id.into(),
                engine: Arc::new(ConversationEngine::new(config.language, chat)),
                capture: AudioCapture::new(device),
                config,
                transcriber,
                synthesizer,
                flags: RwLock::new(Flags {
                    status: CallStatus::Idle,
                    muted: false,
                    speaking: false,
                    listening: false,
                    duration_seconds: 0,
                    generation: 0,
                }),
                event_tx,
                interrupt_tx,
                listen_loop_live: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn language(&self) -> Language {
        self.inner.config.language
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn status(&self) -> CallStatus {
        self.inner.flags.read().status
    }

    pub fn snapshot(&self) -> CallSnapshot {
        let flags = self.inner.flags.read();
        CallSnapshot {
            status: flags.status,
            muted: flags.muted,
            speaking: flags.speaking,
            listening: flags.listening,
            duration_seconds: flags.duration_seconds,
            formatted_duration: format_duration(flags.duration_seconds),
            turn_count: self.inner.engine.turn_count(),
        }
    }

    /// Transcript so far, in conversation order
    pub fn turns(&self) -> Vec<Turn> {
        self.inner.engine.turns()
    }

    /// Conversation engine (shared with the text-chat surface)
    pub fn engine(&self) -> &Arc<ConversationEngine> {
        &self.inner.engine
    }

    /// Start (or restart) the call: Idle/Ended → Connecting
    ///
    /// Resets history, duration, and mute. A call that is already
    /// connecting or active is left untouched.
    pub fn start_call(&self) {
        let inner = &self.inner;
        let (old, generation) = {
            let mut flags = inner.flags.write();
            if !matches!(flags.status, CallStatus::Idle | CallStatus::Ended) {
                tracing::warn!(session = %inner.id, status = ?flags.status, "start_call ignored");
                return;
            }
            flags.generation += 1;
            flags.muted = false;
            flags.speaking = false;
            flags.listening = false;
            flags.duration_seconds = 0;
            let old = flags.status;
            flags.status = CallStatus::Connecting;
            (old, flags.generation)
        };
        inner.engine.clear();
        inner.emit(CallEvent::StatusChanged {
            old,
            new: CallStatus::Connecting,
        });
        tracing::info!(session = %inner.id, "call connecting");

        let task = Arc::clone(inner);
        tokio::spawn(async move { task.run_call(generation).await });
    }

    /// Hang up: cancels in-flight synthesis, stops capture, freezes the
    /// duration counter. Idempotent.
    pub fn end_call(&self) {
        self.inner.end_call();
    }

    /// Return an ended call to Idle, clearing transcript and duration
    pub fn reset(&self) {
        let inner = &self.inner;
        let old = {
            let mut flags = inner.flags.write();
            if flags.status == CallStatus::Idle {
                return;
            }
            flags.generation += 1;
            flags.muted = false;
            flags.speaking = false;
            flags.listening = false;
            flags.duration_seconds = 0;
            let old = flags.status;
            flags.status = CallStatus::Idle;
            old
        };
        let _ = inner.interrupt_tx.send(());
        inner.synthesizer.cancel();
        inner.engine.clear();
        inner.emit(CallEvent::StatusChanged {
            old,
            new: CallStatus::Idle,
        });
    }

    /// Mute or unmute the microphone
    ///
    /// Muting stops any in-flight capture immediately. Unmuting re-arms
    /// listening only when the call is active and the agent is not
    /// currently speaking; otherwise listening resumes when speech ends.
    pub fn toggle_mute(&self, muted: bool) {
        let inner = &self.inner;
        let (was_listening, rearm, generation) = {
            let mut flags = inner.flags.write();
            if flags.muted == muted {
                return;
            }
            flags.muted = muted;
            let was_listening = flags.listening;
            if muted {
                flags.listening = false;
            }
            let rearm = !muted && flags.status == CallStatus::Active && !flags.speaking;
            (was_listening, rearm, flags.generation)
        };

        tracing::debug!(session = %inner.id, muted, "mute toggled");

        if muted {
            let _ = inner.interrupt_tx.send(());
            if was_listening {
                inner.emit(CallEvent::ListeningStopped);
            }
        } else if rearm {
            let task = Arc::clone(inner);
            tokio::spawn(async move { task.listen_entry(generation).await });
        }
    }
}

impl CallInner {
    fn emit(&self, event: CallEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Surface a round-trip failure to the user if configured to
    fn surface(&self, error: &Error) {
        if self.config.surface_turn_errors {
            self.emit(CallEvent::Error {
                message: error.user_message(self.config.language).to_string(),
            });
        }
    }

    fn end_call(&self) {
        let old = {
            let mut flags = self.flags.write();
            if matches!(flags.status, CallStatus::Ended | CallStatus::Idle) {
                return;
            }
            flags.generation += 1;
            flags.speaking = false;
            flags.listening = false;
            let old = flags.status;
            flags.status = CallStatus::Ended;
            old
        };
        let _ = self.interrupt_tx.send(());
        self.synthesizer.cancel();
        self.emit(CallEvent::StatusChanged {
            old,
            new: CallStatus::Ended,
        });
        tracing::info!(session = %self.id, "call ended");
    }

    /// Whether results produced under `generation` may still be applied
    fn is_current(&self, generation: u64) -> bool {
        let flags = self.flags.read();
        flags.generation == generation && flags.status == CallStatus::Active
    }

    /// Whether a new listening cycle may begin
    fn may_listen(&self, generation: u64) -> bool {
        let flags = self.flags.read();
        flags.generation == generation
            && flags.status == CallStatus::Active
            && !flags.muted
            && !flags.speaking
    }

    fn set_listening(&self, listening: bool) -> bool {
        let changed = {
            let mut flags = self.flags.write();
            if listening && (flags.muted || flags.speaking) {
                return false;
            }
            let changed = flags.listening != listening;
            flags.listening = listening;
            changed
        };
        if changed {
            self.emit(if listening {
                CallEvent::ListeningStarted
            } else {
                CallEvent::ListeningStopped
            });
        }
        changed
    }

    fn set_speaking(&self, speaking: bool) -> bool {
        let mut flags = self.flags.write();
        let changed = flags.speaking != speaking;
        flags.speaking = speaking;
        if speaking {
            // Never record while talking
            flags.listening = false;
        }
        changed
    }

    /// Connect, greet, then hand over to the listen loop
    async fn run_call(self: Arc<Self>, generation: u64) {
        tokio::time::sleep(self.config.connect_delay).await;

        let old = {
            let mut flags = self.flags.write();
            if flags.generation != generation || flags.status != CallStatus::Connecting {
                return;
            }
            let old = flags.status;
            flags.status = CallStatus::Active;
            old
        };
        self.emit(CallEvent::StatusChanged {
            old,
            new: CallStatus::Active,
        });
        tracing::info!(session = %self.id, "call active");

        let ticker = Arc::clone(&self);
        tokio::spawn(async move { ticker.duration_ticker(generation).await });

        // Opening agent turn, spoken before the first listening cycle
        let greeting = self.engine.greet();
        self.emit(CallEvent::TurnAdded(greeting.clone()));
        self.speak(&greeting.text, generation).await;

        self.listen_entry(generation).await;
    }

    /// Duration counter: +1 per second, only while Active under this
    /// generation. Frozen (not reset) the moment the call leaves Active.
    async fn duration_ticker(self: Arc<Self>, generation: u64) {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let seconds = {
                let mut flags = self.flags.write();
                if flags.generation != generation || flags.status != CallStatus::Active {
                    None
                } else {
                    flags.duration_seconds += 1;
                    Some(flags.duration_seconds)
                }
            };
            match seconds {
                Some(seconds) => self.emit(CallEvent::DurationTick { seconds }),
                None => break,
            }
        }
    }

    /// Run the listen loop if the single loop slot is free
    ///
    /// If another instance holds the slot it is left to observe the
    /// current flags itself. After releasing the slot the flags are
    /// re-checked: an unmute that raced our exit (and bounced off the
    /// still-held slot) must not leave the call deaf.
    async fn listen_entry(&self, generation: u64) {
        loop {
            if self
                .listen_loop_live
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            let rearmable = self.run_listen_loop(generation).await;
            self.listen_loop_live.store(false, Ordering::SeqCst);

            if !rearmable || !self.may_listen(generation) {
                return;
            }
        }
    }

    /// Listening cycles until the call is muted, ended, or fails to capture
    ///
    /// Returns whether the caller may try to re-arm (false after a capture
    /// failure; retrying a dead microphone would loop).
    async fn run_listen_loop(&self, generation: u64) -> bool {
        loop {
            // Subscribe before the flag check so an interrupt arriving
            // between the two cannot be missed
            let mut interrupt_rx = self.interrupt_tx.subscribe();

            if !self.may_listen(generation) {
                return true;
            }

            if !self.set_listening(true) {
                return true;
            }

            let mut handle = match self.capture.acquire().await {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!(session = %self.id, error = %e, "capture failed");
                    self.set_listening(false);
                    self.surface(&e);
                    return false;
                },
            };

            // Mute/hang-up may have landed while waiting for the device
            if !self.may_listen(generation) {
                handle.release();
                self.set_listening(false);
                return true;
            }

            let mut vad = VoiceActivityDetector::start(self.config.vad, Instant::now());
            let mut recorder =
                UtteranceRecorder::new(self.config.language, self.config.min_payload_bytes);
            let mut interrupted = false;

            loop {
                tokio::select! {
                    _ = interrupt_rx.recv() => {
                        interrupted = true;
                        break;
                    },
                    frame = handle.next_frame() => match frame {
                        None => {
                            interrupted = true;
                            break;
                        },
                        Some(frame) => {
                            recorder.on_chunk(&frame);
                            if vad.poll(frame.level, Instant::now())
                                == Some(VadEvent::UtteranceEnded)
                            {
                                break;
                            }
                        },
                    },
                }
            }

            handle.release();
            self.set_listening(false);

            if interrupted {
                // Top of loop decides whether to re-arm
                continue;
            }

            let payload = match recorder.finalize() {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(session = %self.id, error = %e, "finalize failed");
                    continue;
                },
            };

            if let Err(e) = self.round_trip(payload, generation).await {
                tracing::warn!(session = %self.id, error = %e, "round trip failed");
                self.surface(&e);
            }
        }
    }

    /// One full round-trip: transcription → completion → synthesis
    ///
    /// The generation is re-checked after every suspension point; a result
    /// resolving after hang-up appends nothing and re-arms nothing.
    async fn round_trip(&self, payload: UtterancePayload, generation: u64) -> Result<(), Error> {
        let seconds = payload.duration.as_secs_f32();
        let text = self.transcriber.transcribe(&payload).await?;

        if !self.is_current(generation) {
            tracing::debug!(session = %self.id, "discarding stale transcript");
            return Ok(());
        }

        tracing::info!(session = %self.id, secs = seconds, chars = text.len(), "user utterance");
        let user_turn = self.engine.push_user(&text);
        self.emit(CallEvent::TurnAdded(user_turn));

        let reply = self.engine.complete().await?;

        if !self.is_current(generation) {
            tracing::debug!(session = %self.id, "discarding stale completion");
            return Ok(());
        }

        let agent_turn = self.engine.push_agent(&reply);
        self.emit(CallEvent::TurnAdded(agent_turn));

        self.speak(&reply, generation).await;
        Ok(())
    }

    /// Voice a reply; synthesis failures are caught and never end the call
    async fn speak(&self, text: &str, generation: u64) {
        if !self.is_current(generation) {
            return;
        }

        self.set_speaking(true);
        self.emit(CallEvent::SpeakingStarted {
            text: text.to_string(),
        });

        if let Err(e) = self.synthesizer.speak(text, self.config.language).await {
            tracing::warn!(session = %self.id, error = %e, "synthesis failed");
            self.surface(&e);
        }

        if self.set_speaking(false) {
            self.emit(CallEvent::SpeakingEnded);
        }
    }
}

/// mm:ss rendering of the duration counter
fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(65), "01:05");
        assert_eq!(format_duration(600), "10:00");
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = Settings::default();
        settings.vad.silence_threshold = 0.05;
        settings.call.surface_turn_errors = true;

        let config = CallConfig::from_settings(&settings, Some(Language::Hindi));
        assert_eq!(config.language, Language::Hindi);
        assert_eq!(config.vad.silence_threshold, 0.05);
        assert!(config.surface_turn_errors);
        assert_eq!(config.connect_delay, Duration::from_millis(2000));
    }
}
