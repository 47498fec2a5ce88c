//! Text analysis for selections: the sentence around a selection and the
//! word-or-sentence classification that picks the popup layout and engine list.

use providers::QueryKind;

/// The text of the block element holding a selection, with the selection's byte
/// range inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Block whose selection is the first occurrence of `needle`.
    pub fn around(text: impl Into<String>, needle: &str) -> Option<Self> {
        let text = text.into();
        let start = text.find(needle)?;
        let end = start + needle.len();
        Some(Self { text, start, end })
    }
}

/// Sentence terminators that end a sentence wherever they appear.
fn is_hard_terminator(c: char) -> bool {
    matches!(c, '。' | '！' | '？' | '!' | '?' | '…')
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// The sentence enclosing the selection of `block`, trimmed.
///
/// Walks outward from the selection to the nearest terminator or line break on
/// each side. A `.` only ends a sentence when followed by whitespace or the end of
/// the block, so decimals and abbreviations inside words survive.
pub fn sentence_around(block: &TextBlock) -> String {
    let text = block.text.as_str();
    let end = floor_boundary(text, block.end);
    let start = floor_boundary(text, block.start).min(end);

    let ends_sentence = |idx: usize, c: char| {
        c == '\n'
            || is_hard_terminator(c)
            || (c == '.'
                && text[idx + c.len_utf8()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace))
    };

    let mut from = 0;
    for (idx, c) in text[..start].char_indices().rev() {
        if ends_sentence(idx, c) {
            from = idx + c.len_utf8();
            break;
        }
    }

    let mut to = text.len();
    for (offset, c) in text[end..].char_indices() {
        let idx = end + offset;
        if c == '\n' {
            to = idx;
            break;
        }
        if ends_sentence(idx, c) {
            to = idx + c.len_utf8();
            break;
        }
    }

    text[from..to].trim().to_string()
}

/// Best-effort context for `word`: the enclosing sentence when it actually contains
/// the word, else the word itself.
pub fn context_for(word: &str, block: Option<&TextBlock>) -> String {
    block
        .map(sentence_around)
        .filter(|sentence| sentence.contains(word))
        .unwrap_or_else(|| word.to_string())
}

/// Languages written without spaces between words.
fn is_unspaced(lang: &str) -> bool {
    let primary = lang.split(['-', '_']).next().unwrap_or_default();
    matches!(
        primary.to_ascii_lowercase().as_str(),
        "zh" | "ja" | "th" | "lo" | "km" | "my"
    )
}

/// Whether `input` is a single word of `lang`.
///
/// For spaced scripts that means no whitespace and no punctuation other than
/// in-word hyphens and apostrophes. For unspaced scripts a word is at most four
/// characters with no punctuation.
pub fn is_word(input: &str, lang: &str) -> bool {
    let input = input.trim();
    if input.is_empty() || input.chars().any(char::is_whitespace) {
        return false;
    }
    if is_unspaced(lang) {
        return input.chars().count() <= 4 && !input.chars().any(is_punctuation);
    }
    let inner = input.trim_matches(|c: char| c == '\'' || c == '’');
    !inner.is_empty()
        && inner
            .chars()
            .all(|c| !is_punctuation(c) || matches!(c, '-' | '\'' | '’'))
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '。' | '，' | '、' | '！' | '？' | '；' | '：' | '“' | '”' | '‘' | '’' | '（' | '）' | '《' | '》' | '…' | '—'
        )
}

pub fn classify(input: &str, lang: &str) -> QueryKind {
    if is_word(input, lang) {
        QueryKind::Word
    } else {
        QueryKind::Sentence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_around_word() {
        let block = TextBlock::around(
            "It rained. We sat on the river bank and waited. Then we left.",
            "bank",
        )
        .unwrap();
        assert_eq!(sentence_around(&block), "We sat on the river bank and waited.");
    }

    #[test]
    fn test_sentence_keeps_decimals() {
        let block = TextBlock::around("The price rose 3.5 percent today. Nobody cared.", "percent").unwrap();
        assert_eq!(sentence_around(&block), "The price rose 3.5 percent today.");
    }

    #[test]
    fn test_sentence_stops_at_line_breaks() {
        let block = TextBlock::around("Heading\nfirst line of text\nnext", "line").unwrap();
        assert_eq!(sentence_around(&block), "first line of text");
    }

    #[test]
    fn test_cjk_terminators() {
        let block = TextBlock::around("今天下雨。我们在河边等待！然后离开。", "河边").unwrap();
        assert_eq!(sentence_around(&block), "我们在河边等待！");
    }

    #[test]
    fn test_out_of_range_offsets_are_clamped() {
        let block = TextBlock::new("héllo wörld", 2, 400);
        assert_eq!(sentence_around(&block), "héllo wörld");
    }

    #[test]
    fn test_context_always_contains_word() {
        let block = TextBlock::around("Alpha beta. Gamma delta.", "beta").unwrap();
        assert_eq!(context_for("beta", Some(&block)), "Alpha beta.");
        // A selection spanning a terminator widens the context to both sentences.
        let spanning = TextBlock::around("Alpha beta. Gamma delta.", "beta. Gamma").unwrap();
        let context = context_for("beta. Gamma", Some(&spanning));
        assert!(context.contains("beta. Gamma"));
        assert_eq!(context_for("orphan", None), "orphan");
    }

    #[test]
    fn test_word_classification() {
        assert!(is_word("bank", "en"));
        assert!(is_word("  well-known ", "en"));
        assert!(is_word("don't", "en"));
        assert!(!is_word("river bank", "en"));
        assert!(!is_word("bank.", "en"));
        assert!(!is_word("", "en"));
        assert!(is_word("银行", "zh-CN"));
        assert!(!is_word("我们在河边等待", "zh"));
        assert!(!is_word("银行。", "zh"));
        assert_eq!(classify("Hello there", "en"), QueryKind::Sentence);
        assert_eq!(classify("Hello", "en"), QueryKind::Word);
    }
}
