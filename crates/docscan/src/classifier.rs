//! Aadhaar identity-card heuristic
//!
//! Scores OCR text additively: a known identity keyword, a well-formed
//! 12-digit grouped number, and a date-of-birth marker each contribute a
//! fixed weight. Text at or above the threshold is reported as an identity
//! document.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use bima_config::constants::docscan;

/// 12 digits, optionally in groups of four
static AADHAAR_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}\s?\d{4}\s?\d{4}\b").expect("static pattern"));

/// Keywords that indicate an Aadhaar card, in English and Hindi
const IDENTITY_KEYWORDS: &[&str] = &[
    "aadhaar",
    "aadhar",
    "आधार",
    "uidai",
    "government of india",
    "भारत सरकार",
    "unique identification",
    "enrollment",
];

/// Date-of-birth markers worth a small bonus
const DOB_MARKERS: &[&str] = &["dob", "date of birth", "जन्म"];

/// Classification result for one scanned document
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    /// Verdict: the text looks like an Aadhaar identity card
    pub is_identity_document: bool,
    /// Additive confidence, capped at 100
    pub confidence: u8,
    /// Extracted text, truncated for reporting
    pub extracted_text: String,
    /// The matched document number with whitespace stripped, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
}

/// Classify OCR-extracted text as Aadhaar / not-Aadhaar
pub fn classify_identity_text(text: &str) -> ScanOutcome {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = normalized.to_lowercase();

    let has_keyword = IDENTITY_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword));
    let number = AADHAAR_NUMBER
        .find(text)
        .map(|m| m.as_str().split_whitespace().collect::<String>());
    let has_dob = DOB_MARKERS.iter().any(|marker| lowered.contains(marker));

    let mut confidence: u16 = 0;
    if has_keyword {
        confidence += docscan::KEYWORD_SCORE as u16;
    }
    if number.is_some() {
        confidence += docscan::NUMBER_SCORE as u16;
    }
    if has_dob {
        confidence += docscan::DOB_SCORE as u16;
    }
    let confidence = confidence.min(100) as u8;

    let is_identity_document = confidence >= docscan::IDENTITY_THRESHOLD;

    tracing::debug!(
        confidence,
        is_identity_document,
        has_keyword,
        has_number = number.is_some(),
        "document classified"
    );

    ScanOutcome {
        is_identity_document,
        confidence,
        extracted_text: truncate_chars(text, docscan::TEXT_PREVIEW_CHARS),
        document_number: number,
    }
}

/// Truncate on a character boundary (the text is frequently Devanagari)
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
