//! Generation provider abstraction
//!
//! A provider accepts a [`GenerationRequest`] and returns a stream of text
//! fragments. The stream ending is the completion signal; an `Err` item is
//! the failure signal and nothing after it is read.

mod error;
mod openai;
mod scripted;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAiProvider;
pub use scripted::ScriptedProvider;
pub use types::*;

use crate::config::LlmConfig;
use crate::locale::Locale;
use async_trait::async_trait;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;

/// Ordered text fragments of one generation
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

/// Common interface for generation providers
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Open a generation. Errors here mean nothing was produced.
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream, LlmError>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: GenerationProvider + ?Sized> GenerationProvider for Arc<T> {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream, LlmError> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Logging wrapper for generation providers
pub struct LoggingProvider {
    inner: Arc<dyn GenerationProvider>,
    name: String,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn GenerationProvider>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl GenerationProvider for LoggingProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream, LlmError> {
        let start = std::time::Instant::now();
        let provider = self.name.clone();
        let model = request.model().to_string();
        let shape = request.shape();

        let mut inner = match self.inner.generate(request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(
                    provider = %provider,
                    model = %model,
                    shape,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Generation failed to start"
                );
                return Err(e);
            }
        };

        Ok(Box::pin(async_stream::stream! {
            let mut fragments: usize = 0;
            let mut failed = false;
            while let Some(item) = inner.next().await {
                match &item {
                    Ok(_) => fragments += 1,
                    Err(e) => {
                        tracing::error!(
                            provider = %provider,
                            model = %model,
                            shape,
                            fragments,
                            duration_ms = %start.elapsed().as_millis(),
                            error = %e.message,
                            retryable = e.kind.is_retryable(),
                            "Generation failed mid-stream"
                        );
                        failed = true;
                    }
                }
                yield item;
                if failed {
                    break;
                }
            }
            if !failed {
                tracing::info!(
                    provider = %provider,
                    model = %model,
                    shape,
                    fragments,
                    duration_ms = %start.elapsed().as_millis(),
                    "Generation completed"
                );
            }
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Pick the provider for this process: the OpenAI-compatible client when an
/// API key is configured, otherwise the offline scripted provider.
pub fn build_provider(
    config: &LlmConfig,
    locale: Locale,
) -> Result<Arc<dyn GenerationProvider>, LlmError> {
    let inner: Arc<dyn GenerationProvider> = match &config.api_key {
        Some(key) if !key.is_empty() => {
            Arc::new(OpenAiProvider::new(key.clone(), config.base_url.clone())?)
        }
        _ => {
            tracing::warn!(
                "No OPENAI_API_KEY configured; replies come from the offline scripted provider"
            );
            Arc::new(ScriptedProvider::offline(locale))
        }
    };
    Ok(Arc::new(LoggingProvider::new(inner)))
}
