//! Effects produced by state transitions

use crate::llm::GenerationRequest;
use crate::message::Role;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to history
    CommitMessage { role: Role, content: String },

    /// Start the generation for this turn
    RequestGeneration { request: GenerationRequest },

    /// Tell clients the live buffer changed
    NotifyBuffer { buffer: String },

    /// Tell clients the turn is over
    NotifyIdle,
}

impl Effect {
    pub fn commit_user(content: impl Into<String>) -> Self {
        Effect::CommitMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn commit_assistant(content: impl Into<String>) -> Self {
        Effect::CommitMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
