//! Speech-synthesis adapters
//!
//! The platform voice lives outside this process; what the pipeline needs
//! from it is the timing contract: `speak` resolves when the utterance has
//! been voiced, and `cancel` silences it immediately. [`PacedSynthesizer`]
//! honors that contract by pacing each utterance at a configurable
//! words-per-minute rate, which is enough for the call state machine and
//! for tests. [`UnsupportedSynthesizer`] models a platform with no TTS
//! capability at all.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use unicode_segmentation::UnicodeSegmentation;

use bima_core::{Error, Language, Result, Synthesizer};
use bima_config::constants::call;

/// Synthesizer that paces utterances in real time
///
/// Each `speak` sleeps for the utterance's spoken duration (word count at
/// the configured rate) unless cancelled. Cancellation applies to every
/// in-flight utterance at once — it is the hang-up path.
pub struct PacedSynthesizer {
    rate_wpm: u32,
    cancel: watch::Sender<u64>,
}

impl PacedSynthesizer {
    pub fn new(rate_wpm: u32) -> Self {
        let (cancel, _) = watch::channel(0);
        Self { rate_wpm, cancel }
    }

    /// Spoken duration of a text at the configured pace
    fn pace(&self, text: &str) -> Duration {
        let words = text.unicode_words().count().max(1);
        Duration::from_secs_f64(words as f64 * 60.0 / self.rate_wpm.max(1) as f64)
    }
}

impl Default for PacedSynthesizer {
    fn default() -> Self {
        Self::new(call::SPEAKING_RATE_WPM)
    }
}

#[async_trait]
impl Synthesizer for PacedSynthesizer {
    async fn speak(&self, text: &str, language: Language) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let duration = self.pace(text);
        tracing::debug!(
            locale = language.locale_tag(),
            ms = duration.as_millis() as u64,
            "speaking"
        );

        let mut cancelled = self.cancel.subscribe();
        // Snapshot the generation so only cancels issued after this point cut
        // the utterance short
        cancelled.borrow_and_update();

        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = cancelled.changed() => {
                tracing::debug!("synthesis cancelled mid-utterance");
                Ok(())
            },
        }
    }

    fn cancel(&self) {
        self.cancel.send_modify(|generation| *generation += 1);
    }

    fn name(&self) -> &str {
        "paced"
    }
}

/// Synthesizer for platforms without any TTS capability
pub struct UnsupportedSynthesizer;

#[async_trait]
impl Synthesizer for UnsupportedSynthesizer {
    async fn speak(&self, _text: &str, _language: Language) -> Result<()> {
        Err(Error::SynthesisUnsupported(
            "no speech synthesis available on this platform".to_string(),
        ))
    }

    fn cancel(&self) {}

    fn name(&self) -> &str {
        "unsupported"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_speak_paces_by_word_count() {
        let tts = PacedSynthesizer::new(60); // 1 word per second
        let start = Instant::now();
        tts.speak("one two three", Language::English).await.unwrap();
        // Paused clock auto-advances through the sleep
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_cuts_utterance_short() {
        let tts = Arc::new(PacedSynthesizer::new(60));

        let speaking = {
            let tts = Arc::clone(&tts);
            tokio::spawn(async move {
                tts.speak("a very long sentence with many many words in it", Language::English)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        tts.cancel();

        let result = tokio::time::timeout(Duration::from_millis(200), speaking)
            .await
            .expect("cancel must resolve speak immediately")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_empty_text_is_noop() {
        let tts = PacedSynthesizer::default();
        let start = Instant::now();
        tts.speak("   ", Language::Hindi).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_unsupported_platform() {
        let tts = UnsupportedSynthesizer;
        let err = tts.speak("hello", Language::English).await.unwrap_err();
        assert!(matches!(err, Error::SynthesisUnsupported(_)));
    }

    #[test]
    fn test_hindi_word_pacing() {
        let tts = PacedSynthesizer::new(60);
        // Devanagari words are segmented like any whitespace-delimited words
        let d = tts.pace("नमस्ते मैं आपका बीमा सहायक हूं");
        assert!(d >= Duration::from_secs(5));
    }
}
