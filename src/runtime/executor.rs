//! Conversation runtime executor

use super::{ChatKind, Command, ConversationSnapshot, SessionEvent, SessionHandle};
use crate::llm::{GenerationProvider, GenerationRequest, LlmError};
use crate::message::Message;
use crate::persona::PersonaDefinition;
use crate::prompt::ChatMode;
use crate::state_machine::{transition, ConvContext, ConvState, Effect, Event, TransitionError};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

const COMMAND_BUFFER: usize = 64;
const BROADCAST_BUFFER: usize = 256;

/// Single-session engine task
pub struct ConversationRuntime {
    context: ConvContext,
    state: ConvState,
    history: Arc<[Message]>,
    provider: Arc<dyn GenerationProvider>,
    generation_timeout: Option<Duration>,
    /// Setup persona, re-read at every submit in role-play sessions
    persona_rx: Option<watch::Receiver<PersonaDefinition>>,
    command_rx: mpsc::Receiver<Command>,
    /// Weak so that dropping every handle lets the loop finish
    command_tx: mpsc::WeakSender<Command>,
    snapshot_tx: watch::Sender<ConversationSnapshot>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl ConversationRuntime {
    pub fn new(
        context: ConvContext,
        history: Vec<Message>,
        provider: Arc<dyn GenerationProvider>,
        generation_timeout: Option<Duration>,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_BUFFER);
        let history: Arc<[Message]> = history.into();
        let snapshot = ConversationSnapshot {
            history: history.clone(),
            streaming_buffer: None,
            in_flight: false,
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot);
        let cancel = CancellationToken::new();

        let kind = match context.mode {
            ChatMode::Assistant => ChatKind::Assistant,
            ChatMode::RolePlay(_) => ChatKind::RolePlay,
        };

        let handle = SessionHandle {
            id: context.session_id.clone(),
            kind,
            command_tx: command_tx.clone(),
            snapshot_rx,
            broadcast_tx: broadcast_tx.clone(),
            cancel: cancel.clone(),
        };

        let runtime = Self {
            context,
            state: ConvState::Idle,
            history,
            provider,
            generation_timeout,
            persona_rx: None,
            command_rx,
            command_tx: command_tx.downgrade(),
            snapshot_tx,
            broadcast_tx,
            cancel,
        };

        (runtime, handle)
    }

    /// Follow the setup persona instead of the one the session opened with
    pub fn with_persona(mut self, persona_rx: watch::Receiver<PersonaDefinition>) -> Self {
        self.persona_rx = Some(persona_rx);
        self
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            mode = self.context.mode.label(),
            "Starting conversation runtime"
        );

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        self.cancel.cancel();
        tracing::info!(
            session_id = %self.context.session_id,
            messages = self.history.len(),
            "Conversation runtime stopped"
        );
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { text, reply } => {
                self.refresh_persona();
                let outcome = self.process_event(Event::UserSubmit { text });
                if let Err(e) = &outcome {
                    tracing::debug!(
                        session_id = %self.context.session_id,
                        error = %e,
                        "Submit rejected"
                    );
                }
                // Snapshot is already published, so callers observe the new
                // turn as soon as they hear back
                let _ = reply.send(outcome);
            }
            Command::Generation(event) => {
                if let Err(e) = self.process_event(event) {
                    tracing::warn!(
                        session_id = %self.context.session_id,
                        error = %e,
                        "Dropped generation event"
                    );
                }
            }
        }
    }

    /// Adopt the setup persona if it changed. An incomplete edit keeps the
    /// persona already in use.
    fn refresh_persona(&mut self) {
        let (ChatMode::RolePlay(persona), Some(rx)) = (&mut self.context.mode, &self.persona_rx)
        else {
            return;
        };
        let current = rx.borrow();
        if *persona == *current {
            return;
        }
        if !current.is_ready() {
            tracing::debug!(
                session_id = %self.context.session_id,
                name = %persona.name,
                "Ignoring incomplete persona edit"
            );
            return;
        }
        tracing::debug!(
            session_id = %self.context.session_id,
            name = %current.name,
            "Applying edited persona"
        );
        *persona = current.clone();
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let result = transition(&self.state, &self.context, &self.history, event)?;
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.publish_snapshot();
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::CommitMessage { role, content } => {
                let message = Message::new(role, content);
                tracing::debug!(
                    session_id = %self.context.session_id,
                    message_id = %message.id,
                    role = role.as_str(),
                    "Committed message"
                );
                let mut history = self.history.to_vec();
                history.push(message.clone());
                self.history = history.into();
                let _ = self.broadcast_tx.send(SessionEvent::Message { message });
            }

            Effect::RequestGeneration { request } => {
                self.spawn_generation(request);
            }

            Effect::NotifyBuffer { buffer } => {
                let _ = self.broadcast_tx.send(SessionEvent::Fragment { buffer });
            }

            Effect::NotifyIdle => {
                let _ = self.broadcast_tx.send(SessionEvent::Idle);
            }
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(ConversationSnapshot {
            history: self.history.clone(),
            streaming_buffer: self.state.streaming_buffer().map(str::to_string),
            in_flight: self.state.in_flight(),
        });
    }

    /// Run one generation in the background, feeding its fragments and
    /// exactly one terminal event back into the command queue
    fn spawn_generation(&self, request: GenerationRequest) {
        let Some(command_tx) = self.command_tx.upgrade() else {
            return;
        };
        let provider = self.provider.clone();
        let cancel = self.cancel.clone();
        let timeout = self.generation_timeout;
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            tracing::info!(
                session_id = %session_id,
                shape = request.shape(),
                "Requesting generation"
            );

            let drive = drive_generation(provider.as_ref(), &request, &command_tx);
            let finished = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!(session_id = %session_id, "Generation abandoned on close");
                    return;
                }
                finished = bounded(drive, timeout) => finished,
            };

            if !finished {
                tracing::warn!(session_id = %session_id, ?timeout, "Generation timed out");
                let error = LlmError::timeout("Generation timed out");
                let _ = command_tx
                    .send(Command::Generation(Event::Failed {
                        message: error.message,
                        kind: error.kind,
                    }))
                    .await;
            }
        });
    }
}

/// Await `fut`, giving up after `limit` if one is set. Returns whether it
/// finished.
async fn bounded(fut: impl std::future::Future<Output = ()>, limit: Option<Duration>) -> bool {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.is_ok(),
        None => {
            fut.await;
            true
        }
    }
}

async fn drive_generation(
    provider: &dyn GenerationProvider,
    request: &GenerationRequest,
    command_tx: &mpsc::Sender<Command>,
) {
    let send = |event: Event| command_tx.send(Command::Generation(event));

    let mut stream = match provider.generate(request).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = send(Event::Failed {
                message: e.message,
                kind: e.kind,
            })
            .await;
            return;
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(text) => {
                if send(Event::Fragment { text }).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = send(Event::Failed {
                    message: e.message,
                    kind: e.kind,
                })
                .await;
                return;
            }
        }
    }

    let _ = send(Event::Complete).await;
}
