//! Language definitions and the bilingual message catalog
//!
//! The assistant speaks English and Hindi. User-facing strings that the
//! voice pipeline itself needs (greeting, failure messages) live here so
//! the call controller can pick them without reaching into any UI layer.

use serde::{Deserialize, Serialize};

/// Supported interaction languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    /// Two-letter code as used in API payloads
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
        }
    }

    /// BCP-47 locale tag handed to the speech synthesizer
    pub fn locale_tag(&self) -> &'static str {
        match self {
            Language::English => "en-IN",
            Language::Hindi => "hi-IN",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "en" | "en-in" | "en-us" => Some(Language::English),
            "hi" | "hi-in" => Some(Language::Hindi),
            _ => None,
        }
    }

    /// Look up a catalog message in this language
    pub fn message(&self, key: MessageKey) -> &'static str {
        match (self, key) {
            (Language::English, MessageKey::Welcome) => {
                "Hello! I am your insurance assistant. How can I help you today?"
            },
            (Language::English, MessageKey::GenericError) => {
                "Sorry, something went wrong. Please try again."
            },
            (Language::English, MessageKey::NetworkError) => {
                "No internet connection. Please check and try again."
            },
            (Language::English, MessageKey::NoInformation) => {
                "Sorry, I don't have information on that."
            },
            (Language::Hindi, MessageKey::Welcome) => {
                "नमस्ते! मैं आपका बीमा सहायक हूं। आज मैं आपकी कैसे मदद कर सकता हूं?"
            },
            (Language::Hindi, MessageKey::GenericError) => {
                "माफ़ कीजिए, कुछ गड़बड़ हो गई। कृपया पुनः प्रयास करें।"
            },
            (Language::Hindi, MessageKey::NetworkError) => {
                "इंटरनेट कनेक्शन नहीं है। कृपया जांचें और पुनः प्रयास करें।"
            },
            (Language::Hindi, MessageKey::NoInformation) => {
                "माफ़ कीजिए, मेरे पास इसकी जानकारी नहीं है।"
            },
        }
    }

    /// Greeting spoken when a call becomes active
    pub fn greeting(&self) -> &'static str {
        self.message(MessageKey::Welcome)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Keys into the bilingual message catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    Welcome,
    GenericError,
    NetworkError,
    NoInformation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::English.code(), "en");
        assert_eq!(Language::Hindi.locale_tag(), "hi-IN");
        assert_eq!(Language::from_code("hi-IN"), Some(Language::Hindi));
        assert_eq!(Language::from_code("ta"), None);
    }

    #[test]
    fn test_catalog_is_bilingual() {
        for key in [
            MessageKey::Welcome,
            MessageKey::GenericError,
            MessageKey::NetworkError,
            MessageKey::NoInformation,
        ] {
            assert!(!Language::English.message(key).is_empty());
            assert_ne!(
                Language::English.message(key),
                Language::Hindi.message(key)
            );
        }
    }
}
