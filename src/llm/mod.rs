//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Every provider answers a chat request with a [`ChunkStream`]: an ordered
//! sequence of text deltas. Dropping the stream abandons the call.

pub mod providers;

use std::pin::Pin;

use futures_util::Stream;
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider stream failed: {0}")]
    Stream(String),
}

// ── Request / stream types ────────────────────────────────────────────────────

/// One chat message sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }
}

/// One increment of a streamed completion.
///
/// `delta` is `None` for chunks that carry no text (role announcements,
/// finish markers).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamChunk {
    pub delta: Option<String>,
}

impl StreamChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self { delta: Some(delta.into()) }
    }

    pub fn empty() -> Self {
        Self { delta: None }
    }
}

/// Boxed stream of completion chunks, as returned by every provider.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ProviderError>> + Send>>;

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects; adding a backend means a new
/// module, a new variant and a new `stream_chat` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl LlmProvider {
    /// Start a streamed completion for `messages`.
    ///
    /// Resolves once the provider has accepted the request; text then arrives
    /// through the returned stream.
    pub async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChunkStream, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.stream_chat(messages).await,
            LlmProvider::OpenAiCompatible(p) => p.stream_chat(messages).await,
        }
    }

    /// Short backend name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::OpenAiCompatible(_) => "openai-compatible",
        }
    }
}
