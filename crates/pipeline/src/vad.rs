//! Voice activity detection
//!
//! Classifies a stream of normalized level samples (0–1 scale, one per
//! capture tick) into speech and silence, and emits exactly one
//! end-of-utterance per recording cycle.
//!
//! The detector is created fresh for each listening cycle and discarded
//! when recording stops; its silence timer never survives a cycle.
//!
//! Timing is driven by caller-supplied [`Instant`]s rather than an internal
//! clock, which keeps the state machine deterministic under test.

use std::time::Duration;
use tokio::time::Instant;

use bima_config::constants::vad as defaults;

/// VAD tuning
///
/// Threshold and windows are environment-dependent; defaults come from
/// `bima_config::constants::vad`.
#[derive(Debug, Clone, Copy)]
pub struct VadConfig {
    /// Normalized level above which a sample counts as speech (0–1)
    pub silence_threshold: f32,
    /// Minimum time since recording start before a silence timer may arm
    pub min_recording: Duration,
    /// Uninterrupted silence after detected speech that ends the utterance
    pub silence_duration: Duration,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            silence_threshold: defaults::SILENCE_THRESHOLD,
            min_recording: Duration::from_millis(defaults::MIN_RECORDING_DURATION_MS),
            silence_duration: Duration::from_millis(defaults::SILENCE_DURATION_MS),
        }
    }
}

/// Events emitted while polling the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    /// First sample above the threshold this cycle
    SpeechStarted,
    /// A full silence window elapsed after speech; the utterance is done.
    /// Emitted at most once per detector lifetime.
    UtteranceEnded,
}

/// Per-cycle voice activity detector
///
/// If speech never crosses the threshold, no `UtteranceEnded` fires and the
/// recording must be stopped externally (mute, hang-up). That is a boundary
/// condition of the design, not a failure.
#[derive(Debug)]
pub struct VoiceActivityDetector {
    config: VadConfig,
    started_at: Instant,
    speech_started: bool,
    /// Armed silence timer; at most one live at a time
    silence_deadline: Option<Instant>,
    finished: bool,
}

impl VoiceActivityDetector {
    /// Begin a recording cycle at `now`
    pub fn start(config: VadConfig, now: Instant) -> Self {
        Self {
            config,
            started_at: now,
            speech_started: false,
            silence_deadline: None,
            finished: false,
        }
    }

    /// Feed one level sample taken at `now`
    pub fn poll(&mut self, level: f32, now: Instant) -> Option<VadEvent> {
        if self.finished {
            return None;
        }

        if level > self.config.silence_threshold {
            // Any speech energy cancels a pending silence timer
            self.silence_deadline = None;
            if !self.speech_started {
                self.speech_started = true;
                return Some(VadEvent::SpeechStarted);
            }
            return None;
        }

        // Below threshold: only meaningful once speech has been heard and
        // the minimum recording gate has passed
        if !self.speech_started
            || now.duration_since(self.started_at) <= self.config.min_recording
        {
            return None;
        }

        match self.silence_deadline {
            None => {
                self.silence_deadline = Some(now + self.config.silence_duration);
                None
            },
            Some(deadline) if now >= deadline => {
                self.finished = true;
                self.silence_deadline = None;
                Some(VadEvent::UtteranceEnded)
            },
            Some(_) => None,
        }
    }

    /// Whether speech has been detected this cycle
    pub fn speech_started(&self) -> bool {
        self.speech_started
    }

    /// Whether the end-of-utterance event has fired
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether a silence timer is currently armed
    pub fn silence_pending(&self) -> bool {
        self.silence_deadline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(16); // ~60 Hz

    fn config() -> VadConfig {
        VadConfig::default()
    }

    /// Drive the detector with a level for a span of time, returning the
    /// first event observed (and the time it fired).
    fn drive(
        vad: &mut VoiceActivityDetector,
        level: f32,
        from: Instant,
        span: Duration,
    ) -> (Instant, Option<VadEvent>) {
        let mut now = from;
        let end = from + span;
        while now <= end {
            if let Some(event) = vad.poll(level, now) {
                return (now, Some(event));
            }
            now += TICK;
        }
        (now, None)
    }

    #[test]
    fn test_speech_start_detection() {
        let start = Instant::now();
        let mut vad = VoiceActivityDetector::start(config(), start);

        assert_eq!(vad.poll(0.01, start), None);
        assert_eq!(vad.poll(0.05, start + TICK), Some(VadEvent::SpeechStarted));
        assert!(vad.speech_started());
        // Second loud sample produces no duplicate event
        assert_eq!(vad.poll(0.05, start + TICK * 2), None);
    }

    #[test]
    fn test_no_end_before_min_recording() {
        let start = Instant::now();
        let mut vad = VoiceActivityDetector::start(config(), start);

        // A short spike then silence: nothing may fire before the minimum
        // recording gate, and no timer may even arm
        vad.poll(0.5, start);
        let (now, event) = drive(&mut vad, 0.0, start + TICK, Duration::from_millis(450));
        assert_eq!(event, None);
        assert!(!vad.silence_pending(), "timer armed before min gate");
        assert!(now.duration_since(start) < Duration::from_millis(500) + TICK);
    }

    #[test]
    fn test_utterance_end_after_full_silence_window() {
        let start = Instant::now();
        let mut vad = VoiceActivityDetector::start(config(), start);

        // Speak past the minimum gate
        let (now, _) = drive(&mut vad, 0.5, start, Duration::from_millis(600));
        // Then go silent; the end must fire ~1500ms later
        let (fired_at, event) = drive(&mut vad, 0.0, now, Duration::from_millis(2000));
        assert_eq!(event, Some(VadEvent::UtteranceEnded));
        let silence_span = fired_at.duration_since(now);
        assert!(silence_span >= Duration::from_millis(1500));
        assert!(silence_span < Duration::from_millis(1600));
        assert!(vad.is_finished());
    }

    #[test]
    fn test_speech_restarts_silence_timer() {
        let start = Instant::now();
        let mut vad = VoiceActivityDetector::start(config(), start);

        drive(&mut vad, 0.5, start, Duration::from_millis(600));
        let after_speech = start + Duration::from_millis(600);

        // 1000ms of silence: timer armed but not expired
        let (now, event) = drive(&mut vad, 0.0, after_speech, Duration::from_millis(1000));
        assert_eq!(event, None);
        assert!(vad.silence_pending());

        // Speech again cancels the timer
        assert_eq!(vad.poll(0.5, now), None);
        assert!(!vad.silence_pending());

        // A fresh, full silence window is required from here
        let (fired_at, event) = drive(&mut vad, 0.0, now + TICK, Duration::from_millis(2000));
        assert_eq!(event, Some(VadEvent::UtteranceEnded));
        assert!(fired_at.duration_since(now) >= Duration::from_millis(1500));
    }

    #[test]
    fn test_no_event_when_speech_never_starts() {
        let start = Instant::now();
        let mut vad = VoiceActivityDetector::start(config(), start);

        let (_, event) = drive(&mut vad, 0.0, start, Duration::from_secs(5));
        assert_eq!(event, None);
        assert!(!vad.speech_started());
        assert!(!vad.is_finished());
    }

    #[test]
    fn test_single_end_event_per_cycle() {
        let start = Instant::now();
        let mut vad = VoiceActivityDetector::start(config(), start);

        drive(&mut vad, 0.5, start, Duration::from_millis(600));
        let (now, event) = drive(
            &mut vad,
            0.0,
            start + Duration::from_millis(600),
            Duration::from_millis(2000),
        );
        assert_eq!(event, Some(VadEvent::UtteranceEnded));

        // Finished detector stays inert regardless of further input
        assert_eq!(vad.poll(0.5, now + TICK), None);
        assert_eq!(vad.poll(0.0, now + Duration::from_secs(5)), None);
    }
}
