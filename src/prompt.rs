//! Prompt assembly for both chat modes
//!
//! Plain assistant chat sends the whole conversation as a message list.
//! Role-play composes one instruction from the persona's script, the fixed
//! behavioral rules and the new user text, capped by `max_tokens`; earlier
//! turns are not replayed.

use crate::llm::{GenerationRequest, PromptMessage};
use crate::locale::Locale;
use crate::message::Message;
use crate::persona::PersonaDefinition;
use serde::Serialize;

/// Which kind of conversation a session runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "persona", rename_all = "snake_case")]
pub enum ChatMode {
    Assistant,
    RolePlay(PersonaDefinition),
}

impl ChatMode {
    /// Reply committed when a generation fails
    pub fn fallback_text(&self, locale: Locale) -> &'static str {
        match self {
            ChatMode::Assistant => locale.assistant_fallback(),
            ChatMode::RolePlay(_) => locale.persona_fallback(),
        }
    }

    /// Opening message for a fresh session
    pub fn welcome_text(&self, locale: Locale) -> String {
        match self {
            ChatMode::Assistant => locale.assistant_welcome().to_string(),
            ChatMode::RolePlay(persona) => persona.welcome_text(locale),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChatMode::Assistant => "assistant",
            ChatMode::RolePlay(_) => "role_play",
        }
    }
}

/// Per-session generation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSettings {
    pub locale: Locale,
    pub model: String,
    pub max_tokens: u32,
}

/// Build the request for one turn. `history` excludes the new user message.
pub fn build(
    mode: &ChatMode,
    settings: &PromptSettings,
    history: &[Message],
    new_user_text: &str,
) -> GenerationRequest {
    match mode {
        ChatMode::Assistant => {
            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(PromptMessage::system(
                settings.locale.assistant_system_instruction(),
            ));
            messages.extend(history.iter().map(|m| PromptMessage {
                role: m.role.into(),
                content: m.content.clone(),
            }));
            messages.push(PromptMessage::user(new_user_text));
            GenerationRequest::Messages {
                model: settings.model.clone(),
                messages,
            }
        }
        ChatMode::RolePlay(persona) => GenerationRequest::Instruction {
            prompt: persona_instruction(persona, settings.locale, new_user_text),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        },
    }
}

fn persona_instruction(persona: &PersonaDefinition, locale: Locale, user_text: &str) -> String {
    format!(
        "{script}\n\n{rules}\n\n{situation}\n\n{cue}",
        script = persona.role_script,
        rules = locale.persona_rules(&persona.name),
        situation = locale.persona_situation(user_text),
        cue = locale.persona_answer_cue(&persona.name),
    )
}
