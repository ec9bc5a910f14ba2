//! Utterance recording
//!
//! Accumulates capture frames for the current utterance and packages them
//! into a single WAV payload when the VAD signals end-of-speech. Payloads
//! below the minimum byte size are discarded as noise — no transcription
//! call, no error.

use std::io::Cursor;
use std::time::Duration;

use bima_core::{AudioBuffer, AudioFrame, Channels, Error, Language, Result, SampleRate, UtterancePayload};
use bima_config::constants::{audio, recorder as defaults};

/// WAV container mime hint sent to the transcription endpoint
const WAV_MIME: &str = "audio/wav";

/// Accumulates one utterance worth of audio
pub struct UtteranceRecorder {
    buffer: AudioBuffer,
    language: Language,
    min_payload_bytes: usize,
    sample_rate: SampleRate,
}

impl UtteranceRecorder {
    pub fn new(language: Language, min_payload_bytes: usize) -> Self {
        Self {
            buffer: AudioBuffer::new(
                SampleRate::Hz16000,
                Channels::Mono,
                Duration::from_secs(defaults::MAX_UTTERANCE_SECS),
            ),
            language,
            min_payload_bytes,
            sample_rate: SampleRate::Hz16000,
        }
    }

    /// Append a captured frame (resampled/downmixed as needed)
    pub fn on_chunk(&mut self, frame: &AudioFrame) {
        self.buffer.push(frame);
    }

    /// Captured duration so far
    pub fn duration(&self) -> Duration {
        self.buffer.duration()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Package the recording into one payload, consuming the recorder
    ///
    /// Returns `Ok(None)` for payloads under the minimum byte size (treated
    /// as noise, not an error). The underlying buffer is always released.
    pub fn finalize(self) -> Result<Option<UtterancePayload>> {
        let duration = self.buffer.duration();
        let samples = self.buffer.samples();

        let bytes = encode_wav(samples, self.sample_rate)?;

        if bytes.len() < self.min_payload_bytes {
            tracing::debug!(
                bytes = bytes.len(),
                floor = self.min_payload_bytes,
                "utterance payload below size floor, discarding"
            );
            return Ok(None);
        }

        Ok(Some(UtterancePayload {
            bytes,
            mime: WAV_MIME,
            language: self.language,
            duration,
        }))
    }
}

/// Encode f32 samples as 16-bit mono WAV
fn encode_wav(samples: &[f32], sample_rate: SampleRate) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate.as_u32(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Device(format!("wav writer: {}", e)))?;
        for &sample in samples {
            let pcm = (sample.clamp(-1.0, 1.0) * audio::PCM16_SCALE) as i16;
            writer
                .write_sample(pcm)
                .map_err(|e| Error::Device(format!("wav write: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::Device(format!("wav finalize: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(samples: usize, level: f32) -> AudioFrame {
        AudioFrame::new(
            vec![level; samples],
            SampleRate::Hz16000,
            Channels::Mono,
            0,
        )
    }

    #[test]
    fn test_tiny_payload_discarded() {
        let mut recorder = UtteranceRecorder::new(Language::English, 1000);
        // 400 samples -> 800 PCM bytes + 44-byte header, under the floor
        recorder.on_chunk(&frame_of(400, 0.1));

        let payload = recorder.finalize().unwrap();
        assert!(payload.is_none());
    }

    #[test]
    fn test_payload_packaging() {
        let mut recorder = UtteranceRecorder::new(Language::Hindi, 1000);
        // One second of audio, comfortably above the floor
        recorder.on_chunk(&frame_of(16000, 0.2));

        let payload = recorder.finalize().unwrap().unwrap();
        assert_eq!(payload.mime, "audio/wav");
        assert_eq!(payload.language, Language::Hindi);
        assert!(payload.len() > 16000);
        assert!(payload.duration >= Duration::from_millis(990));
        // RIFF magic
        assert_eq!(&payload.bytes[..4], b"RIFF");
    }

    #[test]
    fn test_empty_recorder_discards() {
        let recorder = UtteranceRecorder::new(Language::English, 1000);
        assert!(recorder.is_empty());
        assert!(recorder.finalize().unwrap().is_none());
    }
}
