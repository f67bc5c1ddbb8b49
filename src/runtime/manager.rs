//! Session lifecycle for one signed-in user
//!
//! Owns the setup persona, the current view, and the two chat sessions. The
//! assistant session is opened on first use; each `start_role_play` opens a
//! fresh role-play session and closes the previous one.

use super::{ConversationRuntime, SessionError, SessionHandle};
use crate::llm::GenerationProvider;
use crate::locale::Locale;
use crate::message::Message;
use crate::persona::{self, PersonaDefinition};
use crate::prompt::{ChatMode, PromptSettings};
use crate::state_machine::ConvContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Which screen the user is looking at. Purely presentational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Assistant,
    Setup,
    RolePlay,
}

/// The two kinds of chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Assistant,
    RolePlay,
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatKind::Assistant => f.write_str("assistant"),
            ChatKind::RolePlay => f.write_str("role_play"),
        }
    }
}

impl FromStr for ChatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assistant" => Ok(ChatKind::Assistant),
            "role_play" | "role-play" => Ok(ChatKind::RolePlay),
            other => Err(format!("unknown chat mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Open every session with a greeting from the assistant or character
    pub seed_welcome: bool,
    pub generation_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            seed_welcome: true,
            generation_timeout: None,
        }
    }
}

#[derive(Default)]
struct Sessions {
    assistant: Option<SessionHandle>,
    role_play: Option<SessionHandle>,
}

/// Manager for one user's chat sessions
pub struct SessionManager {
    provider: Arc<dyn GenerationProvider>,
    settings: PromptSettings,
    options: SessionOptions,
    persona_tx: watch::Sender<PersonaDefinition>,
    view: RwLock<View>,
    sessions: RwLock<Sessions>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        settings: PromptSettings,
        options: SessionOptions,
    ) -> Self {
        let (persona_tx, _) = watch::channel(PersonaDefinition::default());
        Self {
            provider,
            settings,
            options,
            persona_tx,
            view: RwLock::new(View::default()),
            sessions: RwLock::new(Sessions::default()),
        }
    }

    pub fn locale(&self) -> Locale {
        self.settings.locale
    }

    pub async fn view(&self) -> View {
        *self.view.read().await
    }

    /// Switch screens. Sessions are untouched.
    pub async fn set_view(&self, view: View) {
        *self.view.write().await = view;
    }

    pub fn persona(&self) -> PersonaDefinition {
        self.persona_tx.borrow().clone()
    }

    /// Replace the setup persona. A running role-play picks it up next turn.
    pub fn update_persona(&self, persona: PersonaDefinition) {
        self.persona_tx.send_replace(persona);
    }

    pub fn presets(&self) -> Vec<PersonaDefinition> {
        persona::presets(self.locale())
    }

    pub fn load_preset(&self, index: usize) -> Result<PersonaDefinition, SessionError> {
        let preset = self
            .presets()
            .into_iter()
            .nth(index)
            .ok_or(SessionError::UnknownPreset(index))?;
        self.update_persona(preset.clone());
        Ok(preset)
    }

    /// The assistant session, opened on first use
    pub async fn assistant_session(&self) -> SessionHandle {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.assistant.as_ref().filter(|h| !h.is_closed()) {
            return handle.clone();
        }
        let handle = self.spawn_session(ChatMode::Assistant);
        sessions.assistant = Some(handle.clone());
        handle
    }

    pub async fn role_play_session(&self) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .role_play
            .clone()
            .filter(|h| !h.is_closed())
            .ok_or(SessionError::NoRolePlaySession)
    }

    pub async fn session(&self, kind: ChatKind) -> Result<SessionHandle, SessionError> {
        match kind {
            ChatKind::Assistant => Ok(self.assistant_session().await),
            ChatKind::RolePlay => self.role_play_session().await,
        }
    }

    /// Open a role-play session with the current setup persona
    pub async fn start_role_play(&self) -> Result<SessionHandle, SessionError> {
        let persona = self.persona();
        persona.validate()?;

        let handle = self.spawn_session(ChatMode::RolePlay(persona));
        let previous = self.sessions.write().await.role_play.replace(handle.clone());
        if let Some(previous) = previous {
            previous.close();
        }
        self.set_view(View::RolePlay).await;
        Ok(handle)
    }

    /// Close every session, e.g. on logout
    pub async fn close_all(&self) {
        let mut sessions = self.sessions.write().await;
        for handle in [sessions.assistant.take(), sessions.role_play.take()]
            .into_iter()
            .flatten()
        {
            handle.close();
        }
        drop(sessions);
        self.set_view(View::default()).await;
        tracing::info!("Closed all chat sessions");
    }

    fn spawn_session(&self, mode: ChatMode) -> SessionHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        let mut history = Vec::new();
        if self.options.seed_welcome {
            history.push(Message::assistant(mode.welcome_text(self.locale())));
        }

        let follows_persona = matches!(mode, ChatMode::RolePlay(_));
        let context = ConvContext::new(session_id, mode, self.settings.clone());
        let (mut runtime, handle) = ConversationRuntime::new(
            context,
            history,
            self.provider.clone(),
            self.options.generation_timeout,
        );
        if follows_persona {
            runtime = runtime.with_persona(self.persona_tx.subscribe());
        }

        tokio::spawn(runtime.run());
        handle
    }
}
