//! OpenAI-compatible streaming chat completion provider
//! (`/v1/chat/completions` with `stream: true`).
//!
//! Works against OpenAI, Groq, and local OpenAI-compatible servers (Ollama,
//! LM Studio…). All wire types are private to this module — callers only see
//! [`StreamChunk`]s.

use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use futures_util::{Stream, StreamExt, stream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::config::OpenAiConfig;
use crate::llm::{ChatMessage, ChunkStream, ProviderError, StreamChunk};

use super::sse::SseDecoder;

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing streamed `/v1/chat/completions`.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// Only the connect phase is time-bounded; a streamed answer may take as
    /// long as the provider needs.
    pub fn new(config: &OpenAiConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            api_key,
        })
    }

    /// Send `messages` and return the stream of text deltas.
    ///
    /// Transport failures and non-2xx statuses fail here; problems after the
    /// first byte surface as errors inside the stream.
    pub async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChunkStream, ProviderError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| Message { role: m.role, content: &m.content })
                .collect(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            stream: true,
        };

        debug!(
            model = %payload.model,
            temperature = payload.temperature,
            max_tokens = payload.max_tokens,
            messages = payload.messages.len(),
            "sending streamed LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        Ok(Box::pin(decode_chunks(response.bytes_stream())))
    }
}

// ── Body decoding ─────────────────────────────────────────────────────────────

struct DecodeState<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<StreamChunk, ProviderError>>,
    finished: bool,
}

impl<S> DecodeState<S> {
    /// Queue the chunks for decoded SSE payloads. Stops at `[DONE]` or the
    /// first error.
    fn accept(&mut self, events: impl IntoIterator<Item = String>) {
        for event in events {
            if self.finished {
                return;
            }
            if event.trim() == "[DONE]" {
                self.finished = true;
                return;
            }
            let item = parse_event(&event);
            if item.is_err() {
                self.finished = true;
            }
            self.pending.push_back(item);
        }
    }
}

/// Turn an SSE response body into completion chunks.
fn decode_chunks<S, B, E>(body: S) -> impl Stream<Item = Result<StreamChunk, ProviderError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    let events = st.decoder.push(bytes.as_ref());
                    st.accept(events);
                }
                Some(Err(e)) => {
                    error!(error = %e, "LLM response stream interrupted");
                    st.finished = true;
                    return Some((Err(ProviderError::Stream(e.to_string())), st));
                }
                None => {
                    let tail = st.decoder.finish();
                    st.accept(tail);
                    st.finished = true;
                }
            }
        }
    })
}

/// Map one SSE data payload to a chunk.
fn parse_event(event: &str) -> Result<StreamChunk, ProviderError> {
    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(event) {
        error!(message = %env.error.message, "LLM stream returned error event");
        return Err(ProviderError::Request(env.error.message));
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(event)
        .map_err(|e| ProviderError::Stream(format!("malformed stream chunk: {e}")))?;
    let delta = chunk.choices.into_iter().next().and_then(|c| c.delta.content);
    trace!(delta = ?delta, "LLM stream chunk");
    Ok(StreamChunk { delta })
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env
            .error
            .code
            .map(|v| match v {
                serde_json::Value::String(s) => format!(" [code={s}]"),
                other => format!(" [code={other}]"),
            })
            .unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(s: &str) -> Result<Vec<u8>, String> {
        Ok(s.as_bytes().to_vec())
    }

    async fn decode(body: Vec<Result<Vec<u8>, String>>) -> Vec<Result<StreamChunk, ProviderError>> {
        decode_chunks(stream::iter(body)).collect().await
    }

    fn deltas(items: &[Result<StreamChunk, ProviderError>]) -> Vec<Option<&str>> {
        items
            .iter()
            .map(|r| r.as_ref().unwrap().delta.as_deref())
            .collect()
    }

    #[test]
    fn constructs_provider() {
        let cfg = crate::config::Config::test_default();
        assert!(OpenAiCompatibleProvider::new(&cfg.llm.openai, None).is_ok());
    }

    #[test]
    fn request_payload_shape() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("q")];
        let payload = ChatCompletionRequest {
            model: "llama-3.1-70b-versatile",
            messages: messages
                .iter()
                .map(|m| Message { role: m.role, content: &m.content })
                .collect(),
            temperature: 0.5,
            top_p: 1.0,
            max_tokens: 1024,
            stream: true,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "q");
    }

    #[tokio::test]
    async fn decodes_deltas_until_done() {
        let items = decode(vec![
            chunk("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n"),
            chunk("data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choi"),
            chunk("ces\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n"),
            chunk("data: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n"),
        ])
        .await;
        assert_eq!(deltas(&items), [None, Some("Hel"), Some("lo")]);
    }

    #[tokio::test]
    async fn body_without_done_ends_cleanly() {
        let items = decode(vec![chunk("data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}")]).await;
        assert_eq!(deltas(&items), [Some("x")]);
    }

    #[tokio::test]
    async fn empty_choices_yield_textless_chunk() {
        let items = decode(vec![chunk("data: {\"choices\":[]}\n\n")]).await;
        assert_eq!(deltas(&items), [None]);
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let items = decode(vec![
            chunk("data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n"),
            Err("connection reset".to_string()),
            chunk("data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n"),
        ])
        .await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Err(ProviderError::Stream(m)) if m.contains("connection reset")));
    }

    #[tokio::test]
    async fn error_event_surfaces_message() {
        let items = decode(vec![chunk("data: {\"error\":{\"message\":\"rate limited\"}}\n\n")]).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(ProviderError::Request(m)) if m == "rate limited"));
    }

    #[tokio::test]
    async fn malformed_chunk_is_stream_error() {
        let items = decode(vec![chunk("data: not json\n\n")]).await;
        assert!(matches!(&items[0], Err(ProviderError::Stream(m)) if m.contains("malformed")));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_before_streaming() {
        let cfg = crate::config::Config::test_default();
        let p = OpenAiCompatibleProvider::new(&cfg.llm.openai, None).unwrap();
        let err = p.stream_chat(&[ChatMessage::user("q")]).await.err().unwrap();
        assert!(matches!(err, ProviderError::Request(_)));
    }
}
