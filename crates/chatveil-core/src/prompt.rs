//! Prompt templates for the generative sentiment model
//!
//! Both templates are user-editable settings; the user template carries a
//! `{comment}` placeholder substituted at request time.

use crate::types::ChatMessage;

/// Placeholder replaced with the comment text in the user template
pub const COMMENT_PLACEHOLDER: &str = "{comment}";

/// Default system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant that analyzes the sentiment of text. \
Especially, you detect negative comments in live chat feeds.";

/// Default user prompt template
pub const DEFAULT_USER_PROMPT: &str = "\
Analyze the sentiment of the input text and return the result in the following format:

sentiment:positive|negative|neutral
confidence:0.0-1.0

Input: {comment}

Output:";

/// Editable system + user prompt pair for the generative model
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplates {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            user: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Build the two-message prompt for one comment
    pub fn build_messages(&self, comment: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(&self.system),
            ChatMessage::user(self.user.replace(COMMENT_PLACEHOLDER, comment)),
        ]
    }
}
