//! Mock implementations for testing
//!
//! These mocks drive the runtime without network I/O.

use super::{ConversationRuntime, ConversationSnapshot, SessionHandle};
use crate::llm::{FragmentStream, GenerationProvider, GenerationRequest, LlmError};
use crate::locale::Locale;
use crate::message::Message;
use crate::persona::PersonaDefinition;
use crate::prompt::{ChatMode, PromptSettings};
use crate::state_machine::ConvContext;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;

// ============================================================================
// Mock Provider
// ============================================================================

enum Script {
    Fragments(Vec<String>),
    FailAfter(Vec<String>, LlmError),
    FailToStart(LlmError),
    Manual(mpsc::UnboundedReceiver<Result<String, LlmError>>),
    Hang,
}

/// Provider that plays back queued scripts, one per generation
pub struct MockProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Stream these fragments, then complete
    pub fn queue_fragments(&self, fragments: &[&str]) {
        self.push(Script::Fragments(to_owned(fragments)));
    }

    /// Stream these fragments, then fail mid-stream
    pub fn queue_failure_after(&self, fragments: &[&str], error: LlmError) {
        self.push(Script::FailAfter(to_owned(fragments), error));
    }

    /// Fail before any fragment is produced
    pub fn queue_start_failure(&self, error: LlmError) {
        self.push(Script::FailToStart(error));
    }

    /// Stream whatever the test sends; dropping the sender completes
    pub fn queue_manual(&self) -> mpsc::UnboundedSender<Result<String, LlmError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Script::Manual(rx));
        tx
    }

    /// Never produce anything
    pub fn queue_hang(&self) {
        self.push(Script::Hang);
    }

    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn to_owned(fragments: &[&str]) -> Vec<String> {
    fragments.iter().map(|f| (*f).to_string()).collect()
}

#[async_trait]
impl GenerationProvider for MockProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            None => Err(LlmError::network("No mock response queued")),
            Some(Script::FailToStart(e)) => Err(e),
            Some(Script::Fragments(fragments)) => Ok(Box::pin(futures::stream::iter(
                fragments.into_iter().map(Ok::<String, LlmError>),
            ))),
            Some(Script::FailAfter(fragments, e)) => Ok(Box::pin(futures::stream::iter(
                fragments
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(e))),
            ))),
            Some(Script::Manual(rx)) => Ok(Box::pin(UnboundedReceiverStream::new(rx))),
            Some(Script::Hang) => Ok(Box::pin(
                futures::stream::pending::<Result<String, LlmError>>(),
            )),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Test Session Builder
// ============================================================================

/// Helper for spawning a runtime with minimal boilerplate
pub struct TestSession {
    provider: Arc<MockProvider>,
    mode: ChatMode,
    locale: Locale,
    history: Vec<Message>,
    timeout: Option<Duration>,
    persona_rx: Option<watch::Receiver<PersonaDefinition>>,
}

#[allow(dead_code)]
impl TestSession {
    pub fn new(provider: Arc<MockProvider>) -> Self {
        Self {
            provider,
            mode: ChatMode::Assistant,
            locale: Locale::En,
            history: Vec::new(),
            timeout: None,
            persona_rx: None,
        }
    }

    pub fn mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn persona(mut self, persona_rx: watch::Receiver<PersonaDefinition>) -> Self {
        self.persona_rx = Some(persona_rx);
        self
    }

    pub fn spawn(self) -> SessionHandle {
        let context = ConvContext::new(
            "test-session",
            self.mode,
            PromptSettings {
                locale: self.locale,
                model: "test-model".to_string(),
                max_tokens: 500,
            },
        );
        let (mut runtime, handle) =
            ConversationRuntime::new(context, self.history, self.provider, self.timeout);
        if let Some(rx) = self.persona_rx {
            runtime = runtime.with_persona(rx);
        }
        tokio::spawn(runtime.run());
        handle
    }
}

/// Wait until no generation is in flight
pub async fn wait_idle(handle: &SessionHandle) -> ConversationSnapshot {
    let mut rx = handle.watch();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| !s.in_flight))
        .await
        .expect("timed out waiting for idle")
        .map(|snapshot| snapshot.clone())
        .expect("runtime stopped")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::PromptRole;
    use crate::message::Role;
    use crate::runtime::{SessionError, SessionEvent, SessionManager, SessionOptions, View};
    use crate::state_machine::TransitionError;

    fn anna() -> PersonaDefinition {
        PersonaDefinition {
            name: "Anna".to_string(),
            role_script: "You are Anna, a detective.".to_string(),
            ..PersonaDefinition::default()
        }
    }

    fn contents(snapshot: &ConversationSnapshot) -> Vec<(Role, &str)> {
        snapshot
            .history
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn test_persona_turn_commits_streamed_reply() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_fragments(&["Hi", " there", "!"]);
        let session = TestSession::new(provider.clone())
            .mode(ChatMode::RolePlay(anna()))
            .spawn();

        session.submit("Hello").await.unwrap();
        let snapshot = wait_idle(&session).await;

        assert_eq!(
            contents(&snapshot),
            vec![(Role::User, "Hello"), (Role::Assistant, "Hi there!")]
        );
        assert_eq!(snapshot.streaming_buffer, None);

        let requests = provider.recorded_requests();
        assert_eq!(requests.len(), 1);
        let GenerationRequest::Instruction { prompt, .. } = &requests[0] else {
            panic!("role-play must send an instruction");
        };
        assert!(prompt.contains("You are Anna, a detective."));
        assert!(prompt.contains(&Locale::En.persona_rules("Anna")));
        assert!(prompt.contains("Hello"));
    }

    #[tokio::test]
    async fn test_assistant_request_replays_history() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_fragments(&["D"]);
        let session = TestSession::new(provider.clone())
            .history(vec![Message::user("A"), Message::assistant("B")])
            .spawn();

        session.submit("C").await.unwrap();
        wait_idle(&session).await;

        let GenerationRequest::Messages { messages, .. } = &provider.recorded_requests()[0] else {
            panic!("assistant must send a message list");
        };
        let shape: Vec<(PromptRole, &str)> = messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (PromptRole::System, Locale::En.assistant_system_instruction()),
                (PromptRole::User, "A"),
                (PromptRole::Assistant, "B"),
                (PromptRole::User, "C"),
            ]
        );
    }

    #[tokio::test]
    async fn test_mid_stream_failure_commits_fallback_only() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_failure_after(&["half an ans"], LlmError::network("reset"));
        let session = TestSession::new(provider).spawn();

        session.submit("question").await.unwrap();
        let snapshot = wait_idle(&session).await;

        assert_eq!(
            contents(&snapshot),
            vec![
                (Role::User, "question"),
                (Role::Assistant, Locale::En.assistant_fallback())
            ]
        );
    }

    #[tokio::test]
    async fn test_start_failure_commits_fallback() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_start_failure(LlmError::auth("bad key"));
        let session = TestSession::new(provider)
            .mode(ChatMode::RolePlay(anna()))
            .locale(Locale::Ru)
            .spawn();

        session.submit("Привет").await.unwrap();
        let snapshot = wait_idle(&session).await;

        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.history[1].content, Locale::Ru.persona_fallback());
    }

    #[tokio::test]
    async fn test_submit_while_streaming_is_rejected() {
        let provider = Arc::new(MockProvider::new());
        let fragments = provider.queue_manual();
        let session = TestSession::new(provider.clone()).spawn();

        session.submit("first").await.unwrap();
        fragments.send(Ok("par".to_string())).unwrap();

        let err = session.submit("second").await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(TransitionError::Busy)));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.history.len(), 1);
        assert!(snapshot.in_flight);

        fragments.send(Ok("tial".to_string())).unwrap();
        drop(fragments);
        let snapshot = wait_idle(&session).await;
        assert_eq!(
            contents(&snapshot),
            vec![(Role::User, "first"), (Role::Assistant, "partial")]
        );
        assert_eq!(provider.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fragments_share_committed_history() {
        let provider = Arc::new(MockProvider::new());
        let fragments = provider.queue_manual();
        let session = TestSession::new(provider).spawn();
        let mut rx = session.watch();

        session.submit("hi").await.unwrap();
        let before = session.snapshot();

        fragments.send(Ok("Hel".to_string())).unwrap();
        let during = rx
            .wait_for(|s| s.streaming_buffer.as_deref() == Some("Hel"))
            .await
            .unwrap()
            .clone();
        assert!(Arc::ptr_eq(&before.history, &during.history));

        drop(fragments);
        let after = wait_idle(&session).await;
        assert!(!Arc::ptr_eq(&before.history, &after.history));
        assert_eq!(after.history.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_submit_never_reaches_provider() {
        let provider = Arc::new(MockProvider::new());
        let session = TestSession::new(provider.clone()).spawn();

        for text in ["", "   ", "\n\t"] {
            let err = session.submit(text).await.unwrap_err();
            assert!(matches!(err, SessionError::Rejected(TransitionError::EmptyInput)));
        }
        assert!(session.snapshot().history.is_empty());
        assert!(provider.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_events_follow_stream_order() {
        let provider = Arc::new(MockProvider::new());
        let fragments = provider.queue_manual();
        let session = TestSession::new(provider).spawn();
        let mut events = session.subscribe();

        session.submit("hi").await.unwrap();
        fragments.send(Ok("Hel".to_string())).unwrap();
        fragments.send(Ok("lo".to_string())).unwrap();
        drop(fragments);

        let mut seen = Vec::new();
        loop {
            let event = events.recv().await.unwrap();
            let done = event == SessionEvent::Idle;
            seen.push(event);
            if done {
                break;
            }
        }

        assert!(matches!(&seen[0], SessionEvent::Message { message } if message.content == "hi"));
        assert_eq!(
            seen[1],
            SessionEvent::Fragment {
                buffer: "Hel".to_string()
            }
        );
        assert_eq!(
            seen[2],
            SessionEvent::Fragment {
                buffer: "Hello".to_string()
            }
        );
        assert!(
            matches!(&seen[3], SessionEvent::Message { message } if message.content == "Hello")
        );
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn test_timeout_commits_fallback() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_hang();
        let session = TestSession::new(provider)
            .timeout(Duration::from_millis(50))
            .spawn();

        session.submit("anyone there?").await.unwrap();
        let snapshot = wait_idle(&session).await;
        assert_eq!(snapshot.history[1].content, Locale::En.assistant_fallback());
    }

    #[tokio::test]
    async fn test_turns_continue_after_failure() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_start_failure(LlmError::server_error("down"));
        provider.queue_fragments(&["back"]);
        let session = TestSession::new(provider).spawn();

        session.submit("one").await.unwrap();
        wait_idle(&session).await;
        session.submit("two").await.unwrap();
        let snapshot = wait_idle(&session).await;

        assert_eq!(snapshot.history.len(), 4);
        assert_eq!(snapshot.history[3].content, "back");
    }

    #[tokio::test]
    async fn test_closed_session_refuses_submit() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_hang();
        let session = TestSession::new(provider).spawn();

        session.submit("waiting").await.unwrap();
        session.close();

        let err = session.submit("again").await.unwrap_err();
        assert!(matches!(err, SessionError::Closed));
    }

    #[tokio::test]
    async fn test_persona_edits_apply_next_turn() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_fragments(&["ok"]);
        let (persona_tx, persona_rx) = watch::channel(anna());
        let session = TestSession::new(provider.clone())
            .mode(ChatMode::RolePlay(anna()))
            .persona(persona_rx)
            .spawn();

        persona_tx.send_replace(PersonaDefinition {
            name: "Bella".to_string(),
            role_script: "You are Bella, a pirate.".to_string(),
            ..PersonaDefinition::default()
        });
        session.submit("Ahoy").await.unwrap();
        wait_idle(&session).await;

        let GenerationRequest::Instruction { prompt, .. } = &provider.recorded_requests()[0] else {
            panic!("expected instruction");
        };
        assert!(prompt.starts_with("You are Bella, a pirate."));
        assert!(prompt.ends_with("Answer as Bella:"));
    }

    #[tokio::test]
    async fn test_incomplete_persona_edit_keeps_current_persona() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_fragments(&["ok"]);
        provider.queue_fragments(&["ok"]);
        let (persona_tx, persona_rx) = watch::channel(anna());
        let session = TestSession::new(provider.clone())
            .mode(ChatMode::RolePlay(anna()))
            .persona(persona_rx)
            .spawn();

        persona_tx.send_replace(PersonaDefinition::default());
        session.submit("hi").await.unwrap();
        wait_idle(&session).await;

        // A later complete edit still applies
        persona_tx.send_replace(PersonaDefinition {
            name: "Bella".to_string(),
            role_script: "You are Bella, a pirate.".to_string(),
            ..PersonaDefinition::default()
        });
        session.submit("Ahoy").await.unwrap();
        wait_idle(&session).await;

        let requests = provider.recorded_requests();
        let GenerationRequest::Instruction { prompt, .. } = &requests[0] else {
            panic!("expected instruction");
        };
        assert!(prompt.starts_with("You are Anna, a detective."));
        assert!(prompt.ends_with("Answer as Anna:"));
        let GenerationRequest::Instruction { prompt, .. } = &requests[1] else {
            panic!("expected instruction");
        };
        assert!(prompt.ends_with("Answer as Bella:"));
    }

    // ------------------------------------------------------------------------
    // Session manager
    // ------------------------------------------------------------------------

    fn manager(provider: Arc<MockProvider>, seed_welcome: bool) -> SessionManager {
        SessionManager::new(
            provider,
            PromptSettings {
                locale: Locale::En,
                model: "test-model".to_string(),
                max_tokens: 500,
            },
            SessionOptions {
                seed_welcome,
                generation_timeout: None,
            },
        )
    }

    #[tokio::test]
    async fn test_assistant_session_is_seeded_and_reused() {
        let manager = manager(Arc::new(MockProvider::new()), true);

        let first = manager.assistant_session().await;
        let second = manager.assistant_session().await;
        assert_eq!(first.id(), second.id());

        let snapshot = first.snapshot();
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].role, Role::Assistant);
        assert_eq!(snapshot.history[0].content, Locale::En.assistant_welcome());
    }

    #[tokio::test]
    async fn test_role_play_requires_ready_persona() {
        let manager = manager(Arc::new(MockProvider::new()), true);

        let err = manager.start_role_play().await.unwrap_err();
        assert!(matches!(err, SessionError::PersonaNotReady(_)));
        assert!(matches!(
            manager.role_play_session().await,
            Err(SessionError::NoRolePlaySession)
        ));
    }

    #[tokio::test]
    async fn test_start_role_play_replaces_previous_session() {
        let manager = manager(Arc::new(MockProvider::new()), true);
        manager.update_persona(anna());

        let first = manager.start_role_play().await.unwrap();
        let second = manager.start_role_play().await.unwrap();

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_eq!(manager.role_play_session().await.unwrap().id(), second.id());
        assert_eq!(manager.view().await, View::RolePlay);
        assert!(second.snapshot().history[0].content.starts_with("*Anna enters the chat*"));
    }

    #[tokio::test]
    async fn test_view_switch_leaves_sessions_alone() {
        let manager = manager(Arc::new(MockProvider::new()), false);
        let session = manager.assistant_session().await;

        manager.set_view(View::Setup).await;
        assert_eq!(manager.view().await, View::Setup);
        assert!(!session.is_closed());
        assert_eq!(manager.assistant_session().await.id(), session.id());
    }

    #[tokio::test]
    async fn test_load_preset() {
        let manager = manager(Arc::new(MockProvider::new()), false);

        let preset = manager.load_preset(0).unwrap();
        assert_eq!(manager.persona(), preset);
        assert!(preset.is_ready());
        assert!(matches!(
            manager.load_preset(99),
            Err(SessionError::UnknownPreset(99))
        ));
    }

    #[tokio::test]
    async fn test_close_all_closes_sessions() {
        let manager = manager(Arc::new(MockProvider::new()), false);
        manager.update_persona(anna());
        let assistant = manager.assistant_session().await;
        let role_play = manager.start_role_play().await.unwrap();

        manager.close_all().await;

        assert!(assistant.is_closed());
        assert!(role_play.is_closed());
        assert_eq!(manager.view().await, View::Assistant);
        assert!(manager.role_play_session().await.is_err());
    }
}
