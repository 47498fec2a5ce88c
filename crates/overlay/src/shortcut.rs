use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortcutError {
    #[error("shortcut is empty")]
    Empty,
    #[error("shortcut '{0}' has no key, only modifiers")]
    MissingKey(String),
    #[error("shortcut '{0}' names more than one key")]
    TooManyKeys(String),
}

/// A key press as reported by the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// A configured chord such as `ctrl+shift+t` or `alt+x`. Modifiers must match
/// exactly; the key is compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    key: String,
    ctrl: bool,
    shift: bool,
    alt: bool,
    meta: bool,
}

impl KeyChord {
    pub fn matches(&self, press: &KeyPress) -> bool {
        self.key.eq_ignore_ascii_case(press.key.trim())
            && self.ctrl == press.ctrl
            && self.shift == press.shift
            && self.alt == press.alt
            && self.meta == press.meta
    }
}

impl FromStr for KeyChord {
    type Err = ShortcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        if spec.is_empty() {
            return Err(ShortcutError::Empty);
        }
        // `+` on its own (or trailing, as in `ctrl++`) is the plus key.
        let mut parts: Vec<String> = spec.split('+').map(|p| p.trim().to_ascii_lowercase()).collect();
        if spec.ends_with('+') {
            while parts.last().is_some_and(|p| p.is_empty()) {
                parts.pop();
            }
            parts.push("+".to_string());
        }

        let mut chord = KeyChord {
            key: String::new(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        };
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            match part.as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "shift" | "⇧" => chord.shift = true,
                "alt" | "option" | "⌥" => chord.alt = true,
                "meta" | "cmd" | "command" | "⌘" => chord.meta = true,
                _ if chord.key.is_empty() => chord.key = part,
                _ => return Err(ShortcutError::TooManyKeys(spec.to_string())),
            }
        }
        if chord.key.is_empty() {
            return Err(ShortcutError::MissingKey(spec.to_string()));
        }
        Ok(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, name) in [
            (self.ctrl, "ctrl"),
            (self.shift, "shift"),
            (self.alt, "alt"),
            (self.meta, "meta"),
        ] {
            if on {
                write!(f, "{}+", name)?;
            }
        }
        f.write_str(&self.key)
    }
}
