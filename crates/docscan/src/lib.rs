//! Document scanning support
//!
//! The OCR engine is an external collaborator (see
//! [`bima_core::OcrEngine`]); this crate owns what happens to its output:
//! a keyword/number heuristic that decides whether the extracted text came
//! from an Aadhaar identity card, with a confidence score.

pub mod classifier;
pub mod scanner;

pub use classifier::{classify_identity_text, ScanOutcome};
pub use scanner::DocumentScanner;
