//! Centralized constants for the voice agent
//!
//! Single source of truth for tuning defaults used across the codebase.
//! Settings may override any of these per deployment; code should never
//! hardcode a second copy.

/// Voice activity detection defaults
///
/// The thresholds are environment-dependent tuning values (microphone
/// sensitivity, room noise). They are deliberately configuration, with
/// these as the shipped defaults.
pub mod vad {
    /// Normalized level above which a sample counts as speech (0–1 scale)
    pub const SILENCE_THRESHOLD: f32 = 0.02;

    /// A recording must run at least this long before a silence timer may
    /// be armed; gates out single short noise spikes (ms)
    pub const MIN_RECORDING_DURATION_MS: u64 = 500;

    /// Uninterrupted low-energy span after detected speech that ends the
    /// utterance (ms)
    pub const SILENCE_DURATION_MS: u64 = 1500;

    /// Level sampling cadence, matching an animation-frame tick (Hz)
    pub const SAMPLE_RATE_HZ: u32 = 60;
}

/// Utterance recorder defaults
pub mod recorder {
    /// Payloads smaller than this are treated as noise and discarded
    /// without a transcription call (bytes)
    pub const MIN_PAYLOAD_BYTES: usize = 1000;

    /// Upper bound on a single utterance recording (seconds)
    pub const MAX_UTTERANCE_SECS: u64 = 30;
}

/// Audio processing defaults
pub mod audio {
    /// Capture/transcription sample rate (Hz)
    pub const SAMPLE_RATE: u32 = 16000;

    /// Chunk duration pushed by the capture device (ms)
    pub const CHUNK_MS: u64 = 20;

    /// PCM16 normalization divisor (PCM16 -> f32)
    pub const PCM16_NORMALIZE: f32 = 32768.0;

    /// PCM16 scaling multiplier (f32 -> PCM16)
    pub const PCM16_SCALE: f32 = 32767.0;
}

/// Network round-trip bounds (ms)
pub mod timeouts {
    /// Transcription request timeout
    pub const TRANSCRIBE_MS: u64 = 12_000;

    /// Chat-completion request timeout
    pub const COMPLETION_MS: u64 = 12_000;
}

/// Call session defaults
pub mod call {
    /// Simulated connect delay between Connecting and Active (ms)
    pub const CONNECT_DELAY_MS: u64 = 2000;

    /// Duration counter tick (ms)
    pub const DURATION_TICK_MS: u64 = 1000;

    /// Synthesized speech pace used by the paced synthesizer (words/minute)
    pub const SPEAKING_RATE_WPM: u32 = 150;
}

/// Identity-document classifier weights
pub mod docscan {
    /// Score contributed by a known identity keyword
    pub const KEYWORD_SCORE: u8 = 50;

    /// Score contributed by a well-formed 12-digit number
    pub const NUMBER_SCORE: u8 = 40;

    /// Score contributed by a date-of-birth marker
    pub const DOB_SCORE: u8 = 10;

    /// Minimum confidence to call the text an identity document
    pub const IDENTITY_THRESHOLD: u8 = 50;

    /// Extracted text is truncated to this many characters in reports
    pub const TEXT_PREVIEW_CHARS: usize = 500;
}

/// Service endpoints (defaults for local development)
pub mod endpoints {
    /// Chat-completion endpoint (OpenAI-compatible)
    pub const CHAT_DEFAULT: &str = "http://localhost:8000/v1";

    /// Transcription endpoint
    pub const TRANSCRIBE_DEFAULT: &str = "http://localhost:8090";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vad_ordering() {
        // The silence window must be longer than the minimum recording gate
        assert!(vad::SILENCE_DURATION_MS > vad::MIN_RECORDING_DURATION_MS);
        assert!(vad::SILENCE_THRESHOLD > 0.0 && vad::SILENCE_THRESHOLD < 1.0);
    }

    #[test]
    fn test_timeouts_within_recommendation() {
        for ms in [timeouts::TRANSCRIBE_MS, timeouts::COMPLETION_MS] {
            assert!((10_000..=15_000).contains(&ms));
        }
    }

    #[test]
    fn test_docscan_weights() {
        assert!(docscan::KEYWORD_SCORE >= docscan::IDENTITY_THRESHOLD);
        assert!(
            docscan::KEYWORD_SCORE as u16 + docscan::NUMBER_SCORE as u16 + docscan::DOB_SCORE as u16
                <= 100
        );
    }
}
