//! Events that can occur in a conversation

use crate::llm::LlmErrorKind;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    UserSubmit { text: String },

    // Generation events
    Fragment { text: String },
    Complete,
    Failed { message: String, kind: LlmErrorKind },
}
