use anyhow::Result;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{ChatMessage, Role, StreamChunk};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use crate::http::{payload_error, status_error, ChatError, SHARED_HTTP};
use crate::registry::EngineDescriptor;
use crate::sse::SseParser;

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Gemini expects roles `user` | `model` and a separate system instruction.
fn to_gemini_request(messages: &[ChatMessage], temperature: f32) -> GeminiRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();
    for m in messages {
        match m.role {
            Role::System => system_parts.push(GeminiPart {
                text: m.content.clone(),
            }),
            Role::User | Role::Assistant => {
                let role = if m.role == Role::Assistant { "model" } else { "user" };
                contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts: vec![GeminiPart {
                        text: m.content.clone(),
                    }],
                });
            }
        }
    }
    GeminiRequest {
        contents,
        system_instruction: (!system_parts.is_empty()).then(|| GeminiContent {
            role: None,
            parts: system_parts,
        }),
        generation_config: GenerationConfig { temperature },
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    auth_token: String,
    temperature: f32,
    streaming: bool,
}

impl GeminiClient {
    pub fn new(descriptor: &EngineDescriptor) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            endpoint: descriptor.endpoint.clone(),
            auth_token: descriptor.api_key.clone(),
            temperature: descriptor.temperature,
            streaming: descriptor.is_streaming,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// The configured address names the streaming method; the one-shot method
    /// lives next to it.
    fn url(&self, stream: bool) -> Result<Url> {
        let base = if stream {
            self.endpoint.clone()
        } else {
            self.endpoint
                .replace(":streamGenerateContent", ":generateContent")
        };
        let mut url = Url::parse(&base)?;
        {
            let mut query = url.query_pairs_mut();
            if stream {
                query.append_pair("alt", "sse");
            }
            if !self.auth_token.is_empty() {
                query.append_pair("key", &self.auth_token);
            }
        }
        Ok(url)
    }

    async fn post(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response> {
        let req = to_gemini_request(messages, self.temperature);
        let resp = self
            .http
            .post(self.url(stream)?)
            .json(&req)
            .send()
            .await
            .map_err(ChatError::Transport)?;
        if !resp.status().is_success() {
            return Err(status_error("gemini", resp).await.into());
        }
        Ok(resp)
    }

    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let resp = self.post(messages, false).await?;
        let json: serde_json::Value = resp.json().await.map_err(ChatError::Transport)?;
        if let Some(message) = payload_error(&json) {
            return Err(ChatError::Payload(message).into());
        }
        let body: GeminiResponse = serde_json::from_value(json).map_err(|source| ChatError::Decode {
            engine: "gemini".into(),
            source,
        })?;
        Ok(body.text())
    }

    /// Gemini has no terminator record; the stream ends with the body.
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
                if !handle_record(&event.data, tx) {
                    return Ok(());
                }
            }
        }
        if let Some(event) = parser.finish() {
            seen_record = true;
            if !handle_record(&event.data, tx) {
                return Ok(());
            }
        }
        if !seen_record {
            return Err(ChatError::EmptyBody {
                engine: "gemini".into(),
            }
            .into());
        }
        let _ = tx.send(StreamChunk::Done);
        Ok(())
    }
}

fn handle_record(data: &str, tx: &UnboundedSender<StreamChunk>) -> bool {
    let json: serde_json::Value = match serde_json::from_str(data) {
        Ok(json) => json,
        Err(e) => {
            let _ = tx.send(StreamChunk::Error(format!("malformed stream record: {}", e)));
            return false;
        }
    };
    if let Some(message) = payload_error(&json) {
        let _ = tx.send(StreamChunk::Error(message));
        return false;
    }
    match serde_json::from_value::<GeminiResponse>(json) {
        Ok(resp) => {
            let text = resp.text();
            text.is_empty() || tx.send(StreamChunk::Text(text)).is_ok()
        }
        Err(e) => {
            let _ = tx.send(StreamChunk::Error(format!("malformed stream record: {}", e)));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EngineId;
    use tokio::sync::mpsc::unbounded_channel;

    fn client(endpoint: &str) -> GeminiClient {
        GeminiClient::new(&EngineDescriptor {
            id: EngineId::Gemini,
            endpoint: endpoint.into(),
            api_key: "g-key".into(),
            model: String::new(),
            temperature: 0.2,
            is_streaming: true,
        })
    }

    #[test]
    fn test_roles_and_system_instruction() {
        let req = to_gemini_request(
            &[
                ChatMessage::system("sys"),
                ChatMessage::assistant("OK."),
                ChatMessage::user("word"),
            ],
            0.2,
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["contents"][0]["role"], "model");
        assert_eq!(json["contents"][1]["role"], "user");
        assert!(json["generationConfig"]["temperature"].as_f64().unwrap() > 0.19);
    }

    #[test]
    fn test_urls() {
        let c = client("https://example.com/v1beta/models/gemini-pro:streamGenerateContent");
        let stream = c.url(true).unwrap();
        assert_eq!(stream.query(), Some("alt=sse&key=g-key"));
        let once = c.url(false).unwrap();
        assert!(once.path().ends_with(":generateContent"));
        assert_eq!(once.query(), Some("key=g-key"));
    }

    #[test]
    fn test_record_text_joins_parts() {
        let (tx, mut rx) = unbounded_channel();
        assert!(handle_record(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Bon"},{"text":"jour"}]}}]}"#,
            &tx
        ));
        assert_eq!(rx.try_recv().unwrap(), StreamChunk::Text("Bonjour".into()));
    }

    #[test]
    fn test_record_error_stops() {
        let (tx, mut rx) = unbounded_channel();
        assert!(!handle_record(r#"{"error":{"code":400,"message":"API key not valid"}}"#, &tx));
        assert_eq!(rx.try_recv().unwrap(), StreamChunk::Error("API key not valid".into()));
    }
}
