//! Runtime for executing conversations
//!
//! Each chat session runs as one [`ConversationRuntime`] task that owns the
//! history and the state machine. Callers talk to it through a
//! [`SessionHandle`]: a command channel in, a `watch` snapshot and a
//! `broadcast` event feed out.

mod executor;
mod manager;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use manager::{ChatKind, SessionManager, SessionOptions, View};

use crate::message::Message;
use crate::persona::PersonaError;
use crate::state_machine::TransitionError;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Read view of a conversation for rendering. History is shared between
/// snapshots and only reallocated when a message is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub history: Arc<[Message]>,
    pub streaming_buffer: Option<String>,
    pub in_flight: bool,
}

/// Events sent to live clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The live buffer changed
    Fragment { buffer: String },
    /// A message was committed to history
    Message { message: Message },
    /// The turn finished and input is accepted again
    Idle,
}

/// Boundary failures around a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Persona is not ready: {0}")]
    PersonaNotReady(#[from] PersonaError),
    #[error("No role-play session has been started")]
    NoRolePlaySession,
    #[error("Unknown persona preset {0}")]
    UnknownPreset(usize),
    #[error("Session is closed")]
    Closed,
    #[error(transparent)]
    Rejected(#[from] TransitionError),
}

/// Inputs of a runtime task
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        text: String,
        reply: oneshot::Sender<Result<(), TransitionError>>,
    },
    Generation(crate::state_machine::Event),
}

/// Handle to interact with a running conversation
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    kind: ChatKind,
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<ConversationSnapshot>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ChatKind {
        self.kind
    }

    /// Start a turn. Resolves once the engine has accepted or rejected the
    /// text; the reply itself arrives through the snapshot and event feed.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Submit {
                text: text.into(),
                reply,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    #[cfg(test)]
    pub fn watch(&self) -> watch::Receiver<ConversationSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Stop the runtime. An in-flight generation is abandoned.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
