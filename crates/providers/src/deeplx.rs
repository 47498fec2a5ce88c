use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{ChatMessage, Role};

use crate::http::{status_error, ChatError, SHARED_HTTP};
use crate::registry::EngineDescriptor;

#[derive(Debug, Serialize)]
struct DeepLxRequest<'a> {
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct DeepLxResponse {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Plain translation endpoint: no transcript, no stream, one text in and one out.
#[derive(Debug, Clone)]
pub struct DeepLxClient {
    http: Client,
    endpoint: String,
    source_lang: String,
    target_lang: String,
}

impl DeepLxClient {
    pub fn new(descriptor: &EngineDescriptor, source_lang: &str, target_lang: &str) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            endpoint: descriptor.endpoint.clone(),
            source_lang: deeplx_lang(source_lang),
            target_lang: deeplx_lang(target_lang),
        }
    }

    /// Translate the latest user turn.
    pub async fn translate(&self, messages: &[ChatMessage]) -> Result<String> {
        let text = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let req = DeepLxRequest {
            text,
            source_lang: &self.source_lang,
            target_lang: &self.target_lang,
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&req)
            .send()
            .await
            .map_err(ChatError::Transport)?;
        if !resp.status().is_success() {
            return Err(status_error("deeplx", resp).await.into());
        }
        let bytes = resp.bytes().await.map_err(ChatError::Transport)?;
        if bytes.is_empty() {
            return Err(ChatError::EmptyBody {
                engine: "deeplx".into(),
            }
            .into());
        }
        let body: DeepLxResponse = serde_json::from_slice(&bytes).map_err(|source| ChatError::Decode {
            engine: "deeplx".into(),
            source,
        })?;
        match (body.code, body.data) {
            (Some(200) | None, Some(data)) => Ok(data),
            (code, _) => Err(ChatError::Payload(body.message.unwrap_or_else(|| match code {
                Some(code) => format!("deeplx returned code {}", code),
                None => "deeplx returned no translation".to_string(),
            }))
            .into()),
        }
    }
}

/// DeepL language codes are upper-case, with `ZH` for both Chinese variants.
fn deeplx_lang(lang: &str) -> String {
    let primary = lang.split(['-', '_']).next().unwrap_or_default();
    primary.to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!(deeplx_lang("en"), "EN");
        assert_eq!(deeplx_lang("zh-CN"), "ZH");
        assert_eq!(deeplx_lang("pt_BR"), "PT");
    }

    #[test]
    fn test_request_shape() {
        let req = DeepLxRequest {
            text: "hello",
            source_lang: "EN",
            target_lang: "DE",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"text":"hello","source_lang":"EN","target_lang":"DE"}));
    }
}
