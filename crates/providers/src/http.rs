//! HTTP plumbing shared by the engine clients.

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;

pub(crate) static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

/// Why a chat turn failed.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{engine} error: {status}")]
    Status { engine: String, status: StatusCode },

    #[error("{message}")]
    StatusDetail {
        engine: String,
        status: StatusCode,
        message: String,
    },

    #[error("network request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Payload(String),

    #[error("{engine} returned an empty response")]
    EmptyBody { engine: String },

    #[error("could not decode {engine} response: {source}")]
    Decode {
        engine: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Turn a non-2xx response into a [`ChatError`], preferring the message the
/// server put in its JSON body (`detail`, `error.message`, `error`, `message`).
pub(crate) async fn status_error(engine: &str, resp: Response) -> ChatError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        return ChatError::Status {
            engine: engine.to_string(),
            status,
        };
    }
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| payload_error(&json).or_else(|| detail_of(&json)))
        .unwrap_or_else(|| body.chars().take(800).collect());
    ChatError::StatusDetail {
        engine: engine.to_string(),
        status,
        message,
    }
}

/// Extract the message of an error object embedded in a response payload.
pub(crate) fn payload_error(json: &Value) -> Option<String> {
    let error = json.get("error")?;
    if error.is_null() {
        return None;
    }
    let message = match error {
        Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    };
    Some(message)
}

fn detail_of(json: &Value) -> Option<String> {
    ["detail", "message"]
        .iter()
        .find_map(|key| json.get(*key))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}
