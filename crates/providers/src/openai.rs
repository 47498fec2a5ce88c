use anyhow::Result;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{ChatMessage, StreamChunk};
use tokio::sync::mpsc::UnboundedSender;

use crate::http::{payload_error, status_error, ChatError, SHARED_HTTP};
use crate::registry::EngineDescriptor;
use crate::sse::{SseEvent, SseParser};

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
    temperature: f32,
    stream: bool,
}

// ── Non-streaming response types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Streaming response types ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIStreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Client for any endpoint speaking the OpenAI chat-completions wire format:
/// the built-in hosted engine, OpenAI itself, DeepSeek and custom endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    http: Client,
    engine: String,
    endpoint: String,
    auth_token: String,
    model: String,
    temperature: f32,
    streaming: bool,
}

impl OpenAIClient {
    pub fn new(descriptor: &EngineDescriptor) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            engine: descriptor.id.to_string(),
            endpoint: descriptor.endpoint.clone(),
            auth_token: descriptor.api_key.clone(),
            model: descriptor.model.clone(),
            temperature: descriptor.temperature,
            streaming: descriptor.is_streaming,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    async fn post(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response> {
        let req = OpenAIRequest {
            messages,
            model: &self.model,
            temperature: self.temperature,
            stream,
        };
        let mut builder = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&req);
        if !self.auth_token.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.auth_token));
        }
        let resp = builder.send().await.map_err(ChatError::Transport)?;
        if !resp.status().is_success() {
            return Err(status_error(&self.engine, resp).await.into());
        }
        Ok(resp)
    }

    /// One request, one JSON body.
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let resp = self.post(messages, false).await?;
        let bytes = resp.bytes().await.map_err(ChatError::Transport)?;
        if bytes.is_empty() {
            return Err(ChatError::EmptyBody {
                engine: self.engine.clone(),
            }
            .into());
        }
        let json: serde_json::Value = serde_json::from_slice(&bytes).map_err(|source| ChatError::Decode {
            engine: self.engine.clone(),
            source,
        })?;
        if let Some(message) = payload_error(&json) {
            return Err(ChatError::Payload(message).into());
        }
        let body: OpenAIResponse = serde_json::from_value(json).map_err(|source| ChatError::Decode {
            engine: self.engine.clone(),
            source,
        })?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    /// Stream deltas into `tx`.
    ///
    /// Contract: a failure before the first record returns `Err(...)`. Once records
    /// flow, an error payload or a malformed record is sent as `StreamChunk::Error`
    /// and the stream is abandoned.
    pub async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        tx: &UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let resp = self.post(messages, true).await?;

        let mut parser = SseParser::new();
        let mut stream = resp.bytes_stream();
        let mut seen_record = false;

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(ChatError::Transport)?;
            for event in parser.feed(&bytes) {
                seen_record = true;
                if !self.handle_record(&event, tx) {
                    return Ok(());
                }
            }
        }
        if let Some(event) = parser.finish() {
            seen_record = true;
            if !self.handle_record(&event, tx) {
                return Ok(());
            }
        }

        if !seen_record {
            return Err(ChatError::EmptyBody {
                engine: self.engine.clone(),
            }
            .into());
        }
        let _ = tx.send(StreamChunk::Done);
        Ok(())
    }

    /// Returns `false` once the stream is finished, failed, or nobody is listening.
    fn handle_record(&self, record: &SseEvent, tx: &UnboundedSender<StreamChunk>) -> bool {
        if record.is_done() {
            let _ = tx.send(StreamChunk::Done);
            return false;
        }
        let data = record.data.as_str();
        let json: serde_json::Value = match serde_json::from_str(data) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(engine = %self.engine, "malformed stream record: {}", e);
                let _ = tx.send(StreamChunk::Error(format!("malformed stream record: {}", e)));
                return false;
            }
        };
        if let Some(message) = payload_error(&json) {
            let _ = tx.send(StreamChunk::Error(message));
            return false;
        }
        let resp: OpenAIStreamResponse = match serde_json::from_value(json) {
            Ok(resp) => resp,
            Err(e) => {
                let _ = tx.send(StreamChunk::Error(format!("malformed stream record: {}", e)));
                return false;
            }
        };
        let Some(choice) = resp.choices.into_iter().next() else {
            return !tx.is_closed();
        };
        if let Some(content) = choice.delta.content {
            if !content.is_empty() && tx.send(StreamChunk::Text(content)).is_err() {
                return false;
            }
        }
        if choice.finish_reason.is_some() {
            let _ = tx.send(StreamChunk::Done);
            return false;
        }
        true
    }
}
