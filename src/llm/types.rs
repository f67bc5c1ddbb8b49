//! Request shapes sent to a generation provider

use crate::message::Role;
use serde::Serialize;

/// Role of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl PromptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptRole::System => "system",
            PromptRole::User => "user",
            PromptRole::Assistant => "assistant",
        }
    }
}

impl From<Role> for PromptRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => PromptRole::User,
            Role::Assistant => PromptRole::Assistant,
        }
    }
}

/// One entry of a message-list request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }
}

/// A generation request in one of the two shapes providers accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GenerationRequest {
    /// Full conversation as a role-tagged message list
    Messages {
        model: String,
        messages: Vec<PromptMessage>,
    },
    /// One composed instruction with a length cap
    Instruction {
        prompt: String,
        model: String,
        max_tokens: u32,
    },
}

impl GenerationRequest {
    pub fn model(&self) -> &str {
        match self {
            GenerationRequest::Messages { model, .. }
            | GenerationRequest::Instruction { model, .. } => model,
        }
    }

    /// Short label for logs
    pub fn shape(&self) -> &'static str {
        match self {
            GenerationRequest::Messages { .. } => "messages",
            GenerationRequest::Instruction { .. } => "instruction",
        }
    }
}
