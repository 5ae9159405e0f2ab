//! Dummy LLM provider — streams the user message back prefixed with `[echo]`.
//! Used for keyless local runs and for tests that must not touch the network.
//!
//! A scripted variant replays a fixed chunk sequence instead, so callers can
//! exercise empty answers and mid-stream failures. Every variant keeps the
//! messages of its most recent request, shared across clones.

use std::sync::Arc;

use tokio::sync::Mutex;

use futures_util::stream;

use crate::llm::{ChatMessage, ChunkStream, ProviderError, StreamChunk};

/// One step of a scripted reply.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Text(String),
    /// A chunk with no textual delta.
    Empty,
    /// The stream fails at this point.
    Fail(String),
}

#[derive(Debug, Clone, Default)]
pub struct DummyProvider {
    script: Option<Arc<Vec<ScriptStep>>>,
    last_request: Arc<Mutex<Option<Vec<ChatMessage>>>>,
}

impl DummyProvider {
    pub fn echo() -> Self {
        Self::default()
    }

    pub fn scripted(steps: Vec<ScriptStep>) -> Self {
        Self { script: Some(Arc::new(steps)), ..Self::default() }
    }

    /// Messages passed to the latest `stream_chat` call on this provider or
    /// any clone of it.
    pub async fn last_request(&self) -> Option<Vec<ChatMessage>> {
        self.last_request.lock().await.clone()
    }

    pub async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChunkStream, ProviderError> {
        *self.last_request.lock().await = Some(messages.to_vec());

        let items: Vec<Result<StreamChunk, ProviderError>> = match &self.script {
            Some(steps) => steps
                .iter()
                .map(|step| match step {
                    ScriptStep::Text(t) => Ok(StreamChunk::text(t.clone())),
                    ScriptStep::Empty => Ok(StreamChunk::empty()),
                    ScriptStep::Fail(msg) => Err(ProviderError::Stream(msg.clone())),
                })
                .collect(),
            None => {
                let user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == "user")
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                // Role announcement first, like real providers, then word-sized deltas.
                let mut items = vec![Ok(StreamChunk::empty()), Ok(StreamChunk::text("[echo] "))];
                items.extend(user.split_inclusive(' ').map(|w| Ok(StreamChunk::text(w))));
                items
            }
        };
        Ok(Box::pin(stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    async fn drain(p: &DummyProvider, query: &str) -> Vec<Result<StreamChunk, ProviderError>> {
        p.stream_chat(&[ChatMessage::system("sys"), ChatMessage::user(query)])
            .await
            .unwrap()
            .collect()
            .await
    }

    fn joined(items: &[Result<StreamChunk, ProviderError>]) -> String {
        items
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .filter_map(|c| c.delta.as_deref())
            .collect()
    }

    #[tokio::test]
    async fn echo_streams_user_message() {
        let items = drain(&DummyProvider::echo(), "hello there").await;
        assert!(items.len() > 2);
        assert_eq!(joined(&items), "[echo] hello there");
    }

    #[tokio::test]
    async fn echo_includes_textless_chunk() {
        let items = drain(&DummyProvider::echo(), "hi").await;
        assert!(items.iter().any(|r| matches!(r, Ok(c) if c.delta.is_none())));
    }

    #[tokio::test]
    async fn clones_share_last_request() {
        let p = DummyProvider::echo();
        assert!(p.last_request().await.is_none());

        let clone = p.clone();
        drain(&clone, "first").await;
        drain(&clone, "second").await;

        let seen = p.last_request().await.unwrap();
        assert_eq!(seen, vec![ChatMessage::system("sys"), ChatMessage::user("second")]);
    }

    #[tokio::test]
    async fn scripted_replays_steps() {
        let p = DummyProvider::scripted(vec![
            ScriptStep::Text("a".into()),
            ScriptStep::Empty,
            ScriptStep::Fail("boom".into()),
        ]);
        let items = drain(&p, "ignored").await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().delta.as_deref(), Some("a"));
        assert!(items[1].as_ref().unwrap().delta.is_none());
        assert!(matches!(items[2], Err(ProviderError::Stream(_))));
    }
}
