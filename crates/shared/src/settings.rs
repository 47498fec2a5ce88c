//! User settings as persisted by the extension's sync storage.
//!
//! Every field is optional so partial updates can be merged in place. Readers go
//! through the resolving accessors, which fall back to [`defaults`].

use serde::{Deserialize, Serialize};

/// Which query kinds an engine can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    Word,
    Sentence,
    Both,
}

impl Compatibility {
    pub fn supports_word(self) -> bool {
        !matches!(self, Compatibility::Sentence)
    }

    pub fn supports_sentence(self) -> bool {
        !matches!(self, Compatibility::Word)
    }
}

/// One entry of an engine preference list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineItem {
    pub name: String,
    pub value: String,
    pub is_chat: bool,
    pub checked: bool,
    pub compatible: Compatibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub language: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[serde(rename = "openAIKey", skip_serializing_if = "Option::is_none")]
    pub open_ai_key: Option<String>,
    #[serde(rename = "openAIAddress", skip_serializing_if = "Option::is_none")]
    pub open_ai_address: Option<String>,
    #[serde(rename = "openAIModel", skip_serializing_if = "Option::is_none")]
    pub open_ai_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_seek_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_seek_address: Option<String>,

    #[serde(rename = "deepLXAddress", skip_serializing_if = "Option::is_none")]
    pub deep_lx_address: Option<String>,

    #[serde(rename = "customAIAddress", skip_serializing_if = "Option::is_none")]
    pub custom_ai_address: Option<String>,
    #[serde(rename = "customAIModel", skip_serializing_if = "Option::is_none")]
    pub custom_ai_model: Option<String>,
    #[serde(rename = "customAIKey", skip_serializing_if = "Option::is_none")]
    pub custom_ai_key: Option<String>,

    /// Engine id last picked by the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_engine_list: Option<Vec<EngineItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence_engine_list: Option<Vec<EngineItem>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_language: Option<Language>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_selection_icon: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_icon_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_user_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence_system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence_user_content: Option<String>,

    /// Keyboard chord such as `ctrl+shift+t`. Older builds stored it as `shoutcut`.
    #[serde(alias = "shoutcut", skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
}

impl Setting {
    /// Merge a partial update: every field present in `update` overwrites ours.
    pub fn merge(&mut self, update: Setting) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if update.$field.is_some() { self.$field = update.$field; })*
            };
        }
        take!(
            open_ai_key,
            open_ai_address,
            open_ai_model,
            gemini_key,
            gemini_address,
            deep_seek_api_key,
            deep_seek_address,
            deep_lx_address,
            custom_ai_address,
            custom_ai_model,
            custom_ai_key,
            engine,
            word_engine_list,
            sentence_engine_list,
            target_language,
            source_language,
            show_selection_icon,
            trigger_icon,
            trigger_icon_size,
            word_system_prompt,
            word_user_content,
            sentence_system_prompt,
            sentence_user_content,
            shortcut,
        );
    }

    pub fn source_language(&self) -> String {
        self.source_language
            .as_ref()
            .map(|l| l.language.clone())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| defaults::SOURCE_LANGUAGE.to_string())
    }

    pub fn target_language(&self) -> String {
        self.target_language
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(defaults::target_language)
    }

    pub fn show_selection_icon(&self) -> bool {
        self.show_selection_icon
            .unwrap_or(defaults::SHOW_SELECTION_ICON)
    }

    pub fn trigger_icon_size(&self) -> u32 {
        self.trigger_icon_size.unwrap_or(defaults::TRIGGER_ICON_SIZE)
    }

    pub fn word_system_prompt(&self) -> &str {
        non_empty(&self.word_system_prompt).unwrap_or(defaults::WORD_SYSTEM_PROMPT)
    }

    pub fn word_user_content(&self) -> &str {
        non_empty(&self.word_user_content).unwrap_or(defaults::WORD_USER_CONTENT)
    }

    pub fn sentence_system_prompt(&self) -> &str {
        non_empty(&self.sentence_system_prompt).unwrap_or(defaults::SENTENCE_SYSTEM_PROMPT)
    }

    pub fn sentence_user_content(&self) -> &str {
        non_empty(&self.sentence_user_content).unwrap_or(defaults::SENTENCE_USER_CONTENT)
    }

    pub fn shortcut(&self) -> Option<&str> {
        non_empty(&self.shortcut)
    }

    /// Engines offered for single-word queries, user order first.
    pub fn word_engine_list(&self) -> Vec<EngineItem> {
        match &self.word_engine_list {
            Some(list) if !list.is_empty() => list.clone(),
            _ => defaults::word_engine_list(),
        }
    }

    /// Engines offered for sentence queries, user order first.
    pub fn sentence_engine_list(&self) -> Vec<EngineItem> {
        match &self.sentence_engine_list {
            Some(list) if !list.is_empty() => list.clone(),
            _ => defaults::sentence_engine_list(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Normalise any Chinese locale tag other than the two script tags to `zh-Hans`.
pub fn format_zh_code(code: &str) -> String {
    if code.contains("zh") && code != "zh-Hans" && code != "zh-Hant" {
        "zh-Hans".to_string()
    } else {
        code.to_string()
    }
}

pub mod defaults {
    use super::{format_zh_code, Compatibility, EngineItem};

    pub const OPENAI_ADDRESS: &str = "https://api.openai.com/v1/chat/completions";
    pub const OPENAI_MODEL: &str = "gpt-4o";
    pub const DEEPSEEK_ADDRESS: &str = "https://api.deepseek.com/chat/completions";
    pub const DEEPSEEK_MODEL: &str = "deepseek-chat";
    pub const GEMINI_ADDRESS: &str =
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:streamGenerateContent";
    pub const CLICK_TRANSLATE_ADDRESS: &str = "https://api.modelarts-maas.com/v1/chat/completions";
    pub const CLICK_TRANSLATE_MODEL: &str = "DeepSeek-V3";

    pub const SOURCE_LANGUAGE: &str = "en";
    pub const SHOW_SELECTION_ICON: bool = true;
    pub const TRIGGER_ICON_SIZE: u32 = 25;

    pub const WORD_SYSTEM_PROMPT: &str = "I am learning English. I will provide you with a sentence and a word from that sentence. Please explain the meaning of the word in the context of the sentence, following the format of the Oxford English-Chinese Dictionary. Output format:
Definition: The definition of the word in the sentence, keep it concise
US Phonetic: [US Phonetic]
UK Phonetic: [UK Phonetic]";
    pub const WORD_USER_CONTENT: &str = "单词是：{word}，句子是{sentence}";
    pub const SENTENCE_SYSTEM_PROMPT: &str = "You are a translation AI. You only need to provide the translation result without adding any irrelevant content.";
    pub const SENTENCE_USER_CONTENT: &str = "Translate the following text to { targetLanguage }: { sentence } ";

    /// Target language derived from the process locale (`LANG`), like a browser's
    /// `navigator.language`.
    pub fn target_language() -> String {
        std::env::var("LANG")
            .ok()
            .and_then(|lang| {
                let tag = lang.split('.').next().unwrap_or_default().replace('_', "-");
                match tag.as_str() {
                    "" | "C" | "POSIX" => None,
                    _ if tag.starts_with("zh") => Some(format_zh_code(&tag)),
                    _ => tag.split('-').next().map(str::to_string),
                }
            })
            .unwrap_or_else(|| "en".to_string())
    }

    fn item(name: &str, value: &str, is_chat: bool, checked: bool, compatible: Compatibility) -> EngineItem {
        EngineItem {
            name: name.into(),
            value: value.into(),
            is_chat,
            checked,
            compatible,
        }
    }

    /// The full engine catalogue in default order.
    pub fn engine_list() -> Vec<EngineItem> {
        vec![
            item("Click-Translate", "click-translate", true, true, Compatibility::Both),
            item("OpenAI", "openai", true, false, Compatibility::Both),
            item("Gemini", "gemini", true, false, Compatibility::Both),
            item("DeepSeek", "deepseek", true, false, Compatibility::Both),
            item("DeepLX", "deeplx", false, false, Compatibility::Sentence),
            item("Custom", "custom", true, false, Compatibility::Both),
        ]
    }

    pub fn word_engine_list() -> Vec<EngineItem> {
        engine_list()
            .into_iter()
            .filter(|e| e.compatible.supports_word())
            .collect()
    }

    pub fn sentence_engine_list() -> Vec<EngineItem> {
        engine_list()
            .into_iter()
            .filter(|e| e.compatible.supports_sentence())
            .collect()
    }
}
