//! Conversation state types

use crate::locale::Locale;
use crate::prompt::{ChatMode, PromptSettings};
use serde::Serialize;

/// Request lifecycle of one conversation
///
/// The streaming buffer only exists while a generation is in flight, so the
/// "buffer present iff in flight" rule holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for user input
    #[default]
    Idle,

    /// A generation is running; `buffer` holds the fragments received so far
    Streaming { buffer: String },
}

impl ConvState {
    pub fn in_flight(&self) -> bool {
        matches!(self, ConvState::Streaming { .. })
    }

    pub fn streaming_buffer(&self) -> Option<&str> {
        match self {
            ConvState::Idle => None,
            ConvState::Streaming { buffer } => Some(buffer),
        }
    }
}

/// Read-only inputs of a transition
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub session_id: String,
    pub mode: ChatMode,
    pub settings: PromptSettings,
}

impl ConvContext {
    pub fn new(session_id: impl Into<String>, mode: ChatMode, settings: PromptSettings) -> Self {
        Self {
            session_id: session_id.into(),
            mode,
            settings,
        }
    }

    pub fn locale(&self) -> Locale {
        self.settings.locale
    }
}
