//! Audio pipeline for the insurance voice agent
//!
//! The pipeline owns everything between the microphone and the external
//! collaborators:
//!
//! ```text
//! ┌──────────────┐    ┌─────────┐    ┌──────────────────┐    ┌─────────────┐
//! │ AudioCapture │───▶│   VAD   │───▶│ UtteranceRecorder │───▶│ Transcriber │
//! └──────────────┘    └─────────┘    └──────────────────┘    └─────────────┘
//! ```
//!
//! plus the speech-synthesis adapter that voices agent replies. The call
//! controller in `bima-agent` sequences these pieces.

pub mod capture;
pub mod recorder;
pub mod stt;
pub mod tts;
pub mod vad;

pub use capture::{AudioCapture, CaptureDevice, CaptureHandle, ChannelDevice, DeniedDevice};
pub use recorder::UtteranceRecorder;
pub use stt::{HttpTranscriber, TranscriberConfig};
pub use tts::{PacedSynthesizer, UnsupportedSynthesizer};
pub use vad::{VadConfig, VadEvent, VoiceActivityDetector};
