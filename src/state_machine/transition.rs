//! Pure state transition function

use super::{ConvContext, ConvState, Effect, Event};
use crate::message::Message;
use crate::prompt;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Rejected events. None of these change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A reply is still being generated")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// `history` is the committed history before this event; it is only read to
/// build the request of a new turn.
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    history: &[Message],
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (_, Event::UserSubmit { text }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyInput)
        }

        // Idle + UserSubmit -> Streaming
        (ConvState::Idle, Event::UserSubmit { text }) => {
            let text = text.trim();
            let request = prompt::build(&context.mode, &context.settings, history, text);
            Ok(TransitionResult::new(ConvState::Streaming {
                buffer: String::new(),
            })
            .with_effect(Effect::commit_user(text))
            .with_effect(Effect::RequestGeneration { request }))
        }

        (ConvState::Streaming { .. }, Event::UserSubmit { .. }) => Err(TransitionError::Busy),

        // Streaming + Fragment -> Streaming with the fragment appended
        (ConvState::Streaming { buffer }, Event::Fragment { text }) => {
            let mut buffer = buffer.clone();
            buffer.push_str(&text);
            Ok(TransitionResult::new(ConvState::Streaming {
                buffer: buffer.clone(),
            })
            .with_effect(Effect::NotifyBuffer { buffer }))
        }

        // Streaming + Complete -> Idle, buffer committed as the reply
        (ConvState::Streaming { buffer }, Event::Complete) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::commit_assistant(buffer.clone()))
                .with_effect(Effect::NotifyIdle))
        }

        // Streaming + Failed -> Idle, partial buffer dropped for the fallback
        (ConvState::Streaming { .. }, Event::Failed { .. }) => {
            let fallback = context.mode.fallback_text(context.locale());
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::commit_assistant(fallback))
                .with_effect(Effect::NotifyIdle))
        }

        (
            ConvState::Idle,
            event @ (Event::Fragment { .. } | Event::Complete | Event::Failed { .. }),
        ) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} with no generation in flight"
        ))),
    }
}
