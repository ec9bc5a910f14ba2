//! Prompt assembly for the insurance assistant
//!
//! The system prompt fixes the persona and the reply language; history is
//! projected into the completion message list by the conversation engine.

use bima_core::{ChatMessage, Language};

/// System prompt for the insurance-agent persona in the given language
pub fn system_prompt(language: Language) -> &'static str {
    match language {
        Language::English => {
            "You are a professional insurance assistant for Indian customers. \
             Help users understand policies such as PMFBY crop insurance, \
             enrollment requirements, premiums, and claims. Respond concisely \
             in English; answers will be spoken aloud, so keep them brief and \
             conversational. If you do not know something, say so plainly."
        },
        Language::Hindi => {
            "आप भारतीय ग्राहकों के लिए एक पेशेवर बीमा सहायक हैं। \
             प्रधानमंत्री फसल बीमा योजना, नामांकन, प्रीमियम और दावों के बारे में \
             उपयोगकर्ताओं की मदद करें। हिंदी में संक्षिप्त उत्तर दें; उत्तर बोलकर \
             सुनाए जाएंगे, इसलिए उन्हें छोटा और सहज रखें। यदि आपको कुछ पता \
             नहीं है तो स्पष्ट रूप से कहें।"
        },
    }
}

/// Builds the message list for one completion request
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: Language,
}

impl PromptBuilder {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// The system prompt for this builder's language
    pub fn system(&self) -> &'static str {
        system_prompt(self.language)
    }

    /// Full message list: system prompt followed by the history
    pub fn assemble(&self, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.system()));
        messages.extend_from_slice(history);
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bima_core::ChatRole;

    #[test]
    fn test_prompts_differ_by_language() {
        assert_ne!(
            system_prompt(Language::English),
            system_prompt(Language::Hindi)
        );
    }

    #[test]
    fn test_assemble_puts_system_first() {
        let builder = PromptBuilder::new(Language::English);
        let history = vec![
            ChatMessage::assistant("Hello!"),
            ChatMessage::user("What is PMFBY?"),
        ];

        let messages = builder.assemble(&history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[2].content, "What is PMFBY?");
    }
}
