//! API request and response types

use crate::locale::QuickCommand;
use crate::message::Message;
use crate::persona::PersonaDefinition;
use crate::runtime::{ChatKind, ConversationSnapshot, SessionHandle, View};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response to an accepted chat message
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub accepted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewPayload {
    pub view: View,
}

/// Setup persona plus what the preview shows
#[derive(Debug, Serialize)]
pub struct PersonaResponse {
    pub persona: PersonaDefinition,
    pub avatar: String,
    pub ready: bool,
}

impl From<PersonaDefinition> for PersonaResponse {
    fn from(persona: PersonaDefinition) -> Self {
        Self {
            avatar: persona.display_avatar().to_string(),
            ready: persona.is_ready(),
            persona,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PresetsResponse {
    pub presets: Vec<PersonaDefinition>,
}

#[derive(Debug, Serialize)]
pub struct QuickCommandsResponse {
    pub commands: &'static [QuickCommand],
}

/// One chat session as the client renders it
#[derive(Debug, Serialize)]
pub struct ChatSnapshotResponse {
    pub session_id: String,
    pub mode: ChatKind,
    pub history: Vec<Message>,
    pub streaming_buffer: Option<String>,
    pub in_flight: bool,
}

impl ChatSnapshotResponse {
    pub fn new(handle: &SessionHandle, snapshot: ConversationSnapshot) -> Self {
        Self {
            session_id: handle.id().to_string(),
            mode: handle.kind(),
            history: snapshot.history.to_vec(),
            streaming_buffer: snapshot.streaming_buffer,
            in_flight: snapshot.in_flight,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
