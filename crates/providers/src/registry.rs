use anyhow::Result;
use shared::agent_api::{ChatMessage, StreamChunk};
use shared::settings::{defaults, EngineItem, Setting};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

use crate::chat::ChatClient;
use crate::deeplx::DeepLxClient;
use crate::gemini::GeminiClient;
use crate::openai::OpenAIClient;
use crate::prompts::{preset_messages, QueryKind};

/// Every engine the popup knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineId {
    ClickTranslate,
    OpenAi,
    Gemini,
    DeepSeek,
    DeepLx,
    Custom,
}

impl EngineId {
    pub const ALL: [EngineId; 6] = [
        EngineId::ClickTranslate,
        EngineId::OpenAi,
        EngineId::Gemini,
        EngineId::DeepSeek,
        EngineId::DeepLx,
        EngineId::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EngineId::ClickTranslate => "click-translate",
            EngineId::OpenAi => "openai",
            EngineId::Gemini => "gemini",
            EngineId::DeepSeek => "deepseek",
            EngineId::DeepLx => "deeplx",
            EngineId::Custom => "custom",
        }
    }

    /// `None` for identifiers no engine answers to.
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|engine| engine.as_str().eq_ignore_ascii_case(id))
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters of one engine, fixed once resolved from settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineDescriptor {
    pub id: EngineId,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub is_streaming: bool,
}

/// The closed set of engine implementations behind [`ChatClient`].
#[derive(Debug, Clone)]
pub enum Engine {
    OpenAi(OpenAIClient),
    Gemini(GeminiClient),
    DeepLx(DeepLxClient),
    #[cfg(test)]
    Scripted(test_support::ScriptedEngine),
}

impl Engine {
    pub fn from_descriptor(descriptor: &EngineDescriptor, setting: &Setting) -> Self {
        match descriptor.id {
            EngineId::Gemini => Engine::Gemini(GeminiClient::new(descriptor)),
            EngineId::DeepLx => Engine::DeepLx(DeepLxClient::new(
                descriptor,
                &setting.source_language(),
                &setting.target_language(),
            )),
            EngineId::ClickTranslate | EngineId::OpenAi | EngineId::DeepSeek | EngineId::Custom => {
                Engine::OpenAi(OpenAIClient::new(descriptor))
            }
        }
    }

    /// Run one request, writing its output to `tx`.
    ///
    /// Streaming engines emit `Text` deltas and end with `Done` or `Error`; one-shot
    /// engines emit a single `Complete`. An `Err` means the request failed before any
    /// output was produced.
    pub async fn run(&self, messages: &[ChatMessage], tx: &UnboundedSender<StreamChunk>) -> Result<()> {
        match self {
            Engine::OpenAi(client) if client.is_streaming() => client.generate_stream(messages, tx).await,
            Engine::OpenAi(client) => {
                let text = client.generate(messages).await?;
                let _ = tx.send(StreamChunk::Complete(text));
                Ok(())
            }
            Engine::Gemini(client) if client.is_streaming() => client.generate_stream(messages, tx).await,
            Engine::Gemini(client) => {
                let text = client.generate(messages).await?;
                let _ = tx.send(StreamChunk::Complete(text));
                Ok(())
            }
            Engine::DeepLx(client) => {
                let text = client.translate(messages).await?;
                let _ = tx.send(StreamChunk::Complete(text));
                Ok(())
            }
            #[cfg(test)]
            Engine::Scripted(engine) => engine.run(messages, tx).await,
        }
    }
}

fn setting_or_env(value: &Option<String>, env_key: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(env_key).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_default()
}

fn setting_or(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Resolves engine ids chosen in the settings to ready clients.
#[derive(Debug, Clone)]
pub struct EngineRegistry {
    setting: Setting,
    descriptors: HashMap<EngineId, EngineDescriptor>,
}

impl EngineRegistry {
    pub fn from_setting(setting: &Setting) -> Self {
        let descriptor = |id: EngineId, endpoint: String, api_key: String, model: String| EngineDescriptor {
            id,
            endpoint,
            api_key,
            model,
            temperature: 0.0,
            is_streaming: id != EngineId::DeepLx,
        };

        let descriptors = [
            descriptor(
                EngineId::ClickTranslate,
                defaults::CLICK_TRANSLATE_ADDRESS.to_string(),
                setting_or_env(&None, "CLICK_TRANSLATE_API_KEY"),
                defaults::CLICK_TRANSLATE_MODEL.to_string(),
            ),
            descriptor(
                EngineId::OpenAi,
                setting_or(&setting.open_ai_address, defaults::OPENAI_ADDRESS),
                setting_or_env(&setting.open_ai_key, "OPENAI_API_KEY"),
                setting_or(&setting.open_ai_model, defaults::OPENAI_MODEL),
            ),
            descriptor(
                EngineId::Gemini,
                setting_or(&setting.gemini_address, defaults::GEMINI_ADDRESS),
                setting_or_env(&setting.gemini_key, "GEMINI_API_KEY"),
                String::new(),
            ),
            descriptor(
                EngineId::DeepSeek,
                setting_or(&setting.deep_seek_address, defaults::DEEPSEEK_ADDRESS),
                setting_or_env(&setting.deep_seek_api_key, "DEEPSEEK_API_KEY"),
                defaults::DEEPSEEK_MODEL.to_string(),
            ),
            descriptor(
                EngineId::DeepLx,
                setting_or(&setting.deep_lx_address, ""),
                String::new(),
                String::new(),
            ),
            descriptor(
                EngineId::Custom,
                setting_or(&setting.custom_ai_address, ""),
                setting_or(&setting.custom_ai_key, ""),
                setting_or(&setting.custom_ai_model, ""),
            ),
        ]
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

        Self {
            setting: setting.clone(),
            descriptors,
        }
    }

    pub fn setting(&self) -> &Setting {
        &self.setting
    }

    pub fn descriptor(&self, id: &str) -> Option<&EngineDescriptor> {
        self.descriptors.get(&EngineId::parse(id)?)
    }

    /// A client with an empty transcript, or `None` for an unknown id.
    pub fn resolve(&self, id: &str) -> Option<ChatClient> {
        let descriptor = self.descriptor(id)?;
        let engine = Engine::from_descriptor(descriptor, &self.setting);
        Some(ChatClient::new(descriptor.id, engine, Vec::new()))
    }

    /// A client primed with the prompt preset for `word` looked up as `kind`.
    pub fn resolve_query(&self, id: &str, kind: QueryKind, word: &str, sentence: &str) -> Option<ChatClient> {
        let descriptor = self.descriptor(id)?;
        let is_chat = self
            .catalogue_entry(descriptor.id)
            .map(|item| item.is_chat)
            .unwrap_or(true);
        let engine = Engine::from_descriptor(descriptor, &self.setting);
        let preset = preset_messages(&self.setting, kind, is_chat, word, sentence);
        Some(ChatClient::new(descriptor.id, engine, preset))
    }

    /// Engines offered for `kind`, in the user's order, limited to known ids
    /// compatible with the query.
    pub fn engines_for(&self, kind: QueryKind) -> Vec<EngineItem> {
        let list = match kind {
            QueryKind::Word => self.setting.word_engine_list(),
            QueryKind::Sentence => self.setting.sentence_engine_list(),
        };
        list.into_iter()
            .filter(|item| EngineId::parse(&item.value).is_some())
            .filter(|item| match kind {
                QueryKind::Word => item.compatible.supports_word(),
                QueryKind::Sentence => item.compatible.supports_sentence(),
            })
            .collect()
    }

    /// The first checked engine for `kind`, else the first one offered.
    pub fn preferred_engine(&self, kind: QueryKind) -> Option<EngineItem> {
        let engines = self.engines_for(kind);
        engines
            .iter()
            .find(|item| item.checked)
            .or_else(|| engines.first())
            .cloned()
    }

    fn catalogue_entry(&self, id: EngineId) -> Option<EngineItem> {
        self.setting
            .word_engine_list()
            .into_iter()
            .chain(self.setting.sentence_engine_list())
            .chain(defaults::engine_list())
            .find(|item| EngineId::parse(&item.value) == Some(id))
    }
}
