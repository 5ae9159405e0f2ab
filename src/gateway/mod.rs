//! Prompt/response gateway — turns the content store plus a question into a
//! streamed completion and assembles the answer.
//!
//! The store is only read for a point-in-time snapshot before the provider
//! call starts; no lock is held while the answer streams in.

mod prompt;

pub use prompt::{NO_CONTENT_PROMPT, REFUSAL_PHRASE, render_system_prompt};

use futures_util::{Stream, StreamExt};
use tracing::{debug, info};

use crate::content::ContentStore;
use crate::llm::{ChatMessage, LlmProvider, ProviderError, StreamChunk};

/// Answer returned without contacting the provider when there is no content.
pub const NO_CONTENT_ANSWER: &str =
    "No course content available. Please update the content before asking questions.";

/// Join the text of every chunk in arrival order, skipping chunks without
/// text. The first error aborts aggregation and is returned unchanged.
pub async fn collect_text<S>(stream: S) -> Result<String, ProviderError>
where
    S: Stream<Item = Result<StreamChunk, ProviderError>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        if let Some(delta) = chunk?.delta.filter(|d| !d.is_empty()) {
            text.push_str(&delta);
        }
    }
    Ok(text)
}

/// Shared question-answering capability.
///
/// Cheap to clone — the store is reference-counted and providers are cheap
/// clones.
#[derive(Debug, Clone)]
pub struct Gateway {
    store: ContentStore,
    provider: LlmProvider,
}

impl Gateway {
    pub fn new(store: ContentStore, provider: LlmProvider) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Current system prompt, rendered from a snapshot of the store.
    pub async fn system_prompt(&self) -> String {
        render_system_prompt(&self.store.list_modules().await)
    }

    /// Answer `query` from the stored course content.
    ///
    /// With an empty store this returns [`NO_CONTENT_ANSWER`] and never calls
    /// the provider. Otherwise the whole stream is consumed before returning;
    /// provider errors propagate unchanged and nothing is retried.
    pub async fn answer(&self, query: &str) -> Result<String, ProviderError> {
        let modules = self.store.list_modules().await;
        if modules.is_empty() {
            debug!("no course content; skipping provider call");
            return Ok(NO_CONTENT_ANSWER.to_string());
        }

        let messages = [
            ChatMessage::system(render_system_prompt(&modules)),
            ChatMessage::user(query),
        ];

        debug!(
            provider = self.provider.name(),
            modules = modules.len(),
            system_len = messages[0].content.len(),
            query_len = query.len(),
            "requesting completion"
        );

        let stream = self.provider.stream_chat(&messages).await?;
        let answer = collect_text(stream).await?;

        info!(provider = self.provider.name(), answer_len = answer.len(), "question answered");
        Ok(answer)
    }
}
