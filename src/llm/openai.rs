//! `OpenAI`-compatible streaming provider
//!
//! Both request shapes go to `chat/completions` with `stream: true`. A
//! single-instruction request becomes one user message carrying the length
//! cap. Server-sent `data:` lines are decoded into text fragments until
//! `[DONE]`.

use super::{FragmentStream, GenerationProvider, GenerationRequest, LlmError};
use async_trait::async_trait;
use futures::stream::Stream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    chat_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            chat_url: chat_completions_url(&base_url),
        })
    }

    fn translate_request(request: &GenerationRequest) -> OpenAiRequest {
        match request {
            GenerationRequest::Messages { model, messages } => OpenAiRequest {
                model: model.clone(),
                messages: messages
                    .iter()
                    .map(|m| OpenAiMessage {
                        role: m.role.as_str(),
                        content: m.content.clone(),
                    })
                    .collect(),
                max_tokens: None,
                stream: true,
            },
            GenerationRequest::Instruction {
                prompt,
                model,
                max_tokens,
            } => OpenAiRequest {
                model: model.clone(),
                messages: vec![OpenAiMessage {
                    role: "user",
                    content: prompt.clone(),
                }],
                max_tokens: Some(*max_tokens),
                stream: true,
            },
        }
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<FragmentStream, LlmError> {
        let body = Self::translate_request(request);

        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            let message = serde_json::from_str::<OpenAiErrorResponse>(&text)
                .map_or(text, |resp| resp.error.message);
            return Err(LlmError::from_status(status.as_u16(), &message));
        }

        Ok(decode_sse(response.bytes_stream()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Reassemble raw body chunks into lines and decode them into fragments.
/// Lines and multibyte characters may be split across chunks. A trailing
/// line without a newline is still decoded when the body ends.
fn decode_sse<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let mut body = Box::pin(body);

    Box::pin(async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;
        'read: while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(LlmError::network(format!("Stream interrupted: {e}")));
                    finished = true;
                    break 'read;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=newline).collect();
                match parse_sse_line(String::from_utf8_lossy(&raw).trim()) {
                    SseLine::Fragment(text) => yield Ok(text),
                    SseLine::Skip => {}
                    SseLine::Done => {
                        finished = true;
                        break 'read;
                    }
                    SseLine::Failed(e) => {
                        yield Err(e);
                        finished = true;
                        break 'read;
                    }
                }
            }
        }

        if !finished && !buffer.is_empty() {
            match parse_sse_line(String::from_utf8_lossy(&buffer).trim()) {
                SseLine::Fragment(text) => yield Ok(text),
                SseLine::Failed(e) => yield Err(e),
                SseLine::Skip | SseLine::Done => {}
            }
        }
    })
}

/// Meaning of one server-sent line
#[derive(Debug, PartialEq)]
enum SseLine {
    Fragment(String),
    Skip,
    Done,
    Failed(LlmError),
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(payload) = line.strip_prefix("data:").map(str::trim_start) else {
        // Comments, `event:` lines and blank separators
        return SseLine::Skip;
    };

    if payload == "[DONE]" {
        return SseLine::Done;
    }
    if payload.trim().is_empty() {
        return SseLine::Skip;
    }

    if let Ok(chunk) = serde_json::from_str::<OpenAiChunk>(payload) {
        return match chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
        {
            Some(text) if !text.is_empty() => SseLine::Fragment(text),
            _ => SseLine::Skip,
        };
    }

    let message = serde_json::from_str::<OpenAiErrorResponse>(payload)
        .map_or_else(|_| payload.to_string(), |resp| resp.error.message);
    SseLine::Failed(LlmError::stream(format!("Provider error in stream: {message}")))
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChunk {
    choices: Vec<OpenAiChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChunkChoice {
    delta: OpenAiDelta,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}
