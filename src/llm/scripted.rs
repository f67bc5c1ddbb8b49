//! Offline provider that streams a fixed reply
//!
//! Used when no API key is configured so the chat surface stays usable in
//! development. The reply is split on word boundaries and paced like a real
//! token stream.

use super::{FragmentStream, GenerationProvider, GenerationRequest, LlmError};
use crate::locale::Locale;
use async_trait::async_trait;
use std::time::Duration;

const FRAGMENT_DELAY: Duration = Duration::from_millis(40);

pub struct ScriptedProvider {
    reply: String,
    delay: Duration,
}

impl ScriptedProvider {
    pub fn new(reply: impl Into<String>, delay: Duration) -> Self {
        Self {
            reply: reply.into(),
            delay,
        }
    }

    /// Provider announcing that no real model is configured
    pub fn offline(locale: Locale) -> Self {
        let reply = match locale {
            Locale::Ru => "Я работаю в автономном режиме: провайдер модели не настроен. Задайте OPENAI_API_KEY, чтобы получать настоящие ответы.",
            Locale::En => "I'm running offline: no model provider is configured. Set OPENAI_API_KEY to get real replies.",
        };
        Self::new(reply, FRAGMENT_DELAY)
    }
}

/// Split text into word-sized fragments that concatenate back to the input
fn split_fragments(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate(&self, _request: &GenerationRequest) -> Result<FragmentStream, LlmError> {
        let fragments = split_fragments(&self.reply);
        let delay = self.delay;
        Ok(Box::pin(async_stream::stream! {
            for fragment in fragments {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield Ok::<String, LlmError>(fragment);
            }
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
