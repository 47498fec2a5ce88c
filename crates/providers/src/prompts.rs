//! Prompt templates and the message presets built from them.

use regex::{Captures, Regex};
use shared::agent_api::ChatMessage;
use shared::settings::Setting;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\s*(word|sentence|targetLanguage)\s*\}").expect("static pattern")
});

/// How a selection is looked up: a single word gets a dictionary entry, anything
/// longer gets translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Word,
    Sentence,
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateVars<'a> {
    pub word: &'a str,
    pub sentence: &'a str,
    pub target_language: &'a str,
}

/// Replace `{word}`, `{sentence}` and `{targetLanguage}` (whitespace inside the
/// braces allowed). Substituted values are inserted literally.
pub fn fill_template(template: &str, vars: TemplateVars<'_>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "word" => vars.word,
            "sentence" => vars.sentence,
            _ => vars.target_language,
        })
        .into_owned()
}

/// Opening transcript for a query.
///
/// Chat engines get the configured system prompt and user template; word queries
/// are primed with an assistant acknowledgement so the model answers in the
/// dictionary format straight away. Non-chat engines receive the bare text.
pub fn preset_messages(
    setting: &Setting,
    kind: QueryKind,
    is_chat: bool,
    word: &str,
    sentence: &str,
) -> Vec<ChatMessage> {
    if !is_chat {
        return vec![ChatMessage::user(word)];
    }
    let target_language = setting.target_language();
    let vars = TemplateVars {
        word,
        sentence,
        target_language: &target_language,
    };
    match kind {
        QueryKind::Word => vec![
            ChatMessage::system(fill_template(setting.word_system_prompt(), vars)),
            ChatMessage::assistant("OK."),
            ChatMessage::user(fill_template(setting.word_user_content(), vars)),
        ],
        QueryKind::Sentence => vec![
            ChatMessage::system(fill_template(setting.sentence_system_prompt(), vars)),
            // A sentence query's selection is the sentence itself.
            ChatMessage::user(fill_template(
                setting.sentence_user_content(),
                TemplateVars {
                    sentence: word,
                    ..vars
                },
            )),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::agent_api::Role;

    fn vars<'a>() -> TemplateVars<'a> {
        TemplateVars {
            word: "bank",
            sentence: "I sat on the river bank.",
            target_language: "de",
        }
    }

    #[test]
    fn test_placeholders_tolerate_whitespace() {
        assert_eq!(
            fill_template("{word} | { sentence } | {  targetLanguage}", vars()),
            "bank | I sat on the river bank. | de"
        );
    }

    #[test]
    fn test_template_without_placeholders_is_unchanged() {
        let template = "Explain this, please: {words} {Sentence}";
        assert_eq!(fill_template(template, vars()), template);
        let once = fill_template("{word}", vars());
        assert_eq!(fill_template(&once, vars()), once);
    }

    #[test]
    fn test_values_are_inserted_literally() {
        let filled = fill_template(
            "{word} / {targetLanguage}",
            TemplateVars {
                word: "$1 {sentence} {targetLanguage}",
                ..vars()
            },
        );
        assert_eq!(filled, "$1 {sentence} {targetLanguage} / de");
    }

    #[test]
    fn test_selection_with_braces_reaches_engine_unchanged() {
        let setting = Setting {
            target_language: Some("de".into()),
            ..Default::default()
        };
        let selection = "Set {targetLanguage} in the config.";
        let messages = preset_messages(&setting, QueryKind::Sentence, true, selection, "");
        assert_eq!(
            messages[1].content,
            "Translate the following text to de: Set {targetLanguage} in the config. "
        );
    }

    #[test]
    fn test_word_preset_is_primed() {
        let setting = Setting {
            target_language: Some("fr".into()),
            word_user_content: Some("{word} in {sentence}".into()),
            ..Default::default()
        };
        let messages = preset_messages(&setting, QueryKind::Word, true, "bank", "the bank.");
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Assistant, Role::User]);
        assert_eq!(messages[1].content, "OK.");
        assert_eq!(messages[2].content, "bank in the bank.");
    }

    #[test]
    fn test_sentence_preset_uses_selection_as_sentence() {
        let setting = Setting {
            target_language: Some("fr".into()),
            ..Default::default()
        };
        let messages = preset_messages(&setting, QueryKind::Sentence, true, "Good morning.", "");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "Translate the following text to fr: Good morning. ");
    }

    #[test]
    fn test_non_chat_engine_gets_bare_text() {
        let messages = preset_messages(&Setting::default(), QueryKind::Sentence, false, "Hallo", "");
        assert_eq!(messages, vec![ChatMessage::user("Hallo")]);
    }
}
