//! Streams a chat turn to a terminal.

use anyhow::{bail, Result};
use providers::ChatTurn;
use shared::agent_api::ChatEvent;
use std::io::Write;

/// Print a turn as it arrives. Returns the final text.
pub async fn print_turn(mut turn: ChatTurn, out: &mut impl Write) -> Result<String> {
    let mut printed = String::new();
    while let Some(event) = turn.next_event().await {
        match event {
            ChatEvent::Requesting => tracing::debug!(turn = %turn.id(), "request sent"),
            ChatEvent::Progress(text) => {
                write!(out, "{}", delta(&printed, &text))?;
                out.flush()?;
                printed = text;
            }
            ChatEvent::Complete(text) => {
                writeln!(out, "{}", delta(&printed, &text))?;
                return Ok(text);
            }
            ChatEvent::Failed(message) => {
                if !printed.is_empty() {
                    writeln!(out)?;
                }
                bail!(message);
            }
        }
    }
    bail!("request was cancelled")
}

/// The unseen tail of `current`. A snapshot that does not extend what was printed
/// is shown on a fresh line in full.
fn delta<'a>(printed: &str, current: &'a str) -> std::borrow::Cow<'a, str> {
    match current.strip_prefix(printed) {
        Some(tail) => tail.into(),
        None => format!("\n{}", current).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta() {
        assert_eq!(delta("", "Uf"), "Uf");
        assert_eq!(delta("Uf", "Ufer"), "er");
        assert_eq!(delta("Ufer", "Ufer"), "");
        assert_eq!(delta("Ufer", "Bank"), "\nBank");
    }
}
