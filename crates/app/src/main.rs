use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use overlay::ResultPane;
use providers::{EngineRegistry, QueryKind};
use shared::collaborators::{LogNotifier, SettingsStore};
use shared::settings::Setting;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

mod render;
mod settings_store;

use settings_store::JsonSettingsStore;

#[derive(Parser, Debug)]
#[command(name = "lingo", version, about = "Look up words and translate sentences with AI engines")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file to use instead of the one in the config directory.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a word or a sentence, streaming the answer.
    Translate {
        text: String,

        /// Sentence the text was taken from.
        #[arg(long, short = 'c')]
        context: Option<String>,

        /// Engine id, e.g. openai, gemini, deeplx.
        #[arg(long, short = 'e')]
        engine: Option<String>,

        /// Follow-up question, asked after the answer. May be repeated.
        #[arg(long = "ask", value_name = "QUESTION")]
        follow_ups: Vec<String>,
    },
    /// List the engines offered for a kind of query.
    Engines {
        /// Engines for single words (the default).
        #[arg(long, conflicts_with = "sentence")]
        word: bool,
        /// Engines for sentences.
        #[arg(long)]
        sentence: bool,
    },
    /// Inspect or change settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the settings file location.
    Path,
    /// Print the stored settings.
    Show,
    /// Set one field, e.g. `set targetLanguage de` or `set showSelectionIcon false`.
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = match cli.config {
        Some(path) => JsonSettingsStore::new(path),
        None => JsonSettingsStore::from_project_dirs()?,
    };

    match cli.command {
        Command::Translate {
            text,
            context,
            engine,
            follow_ups,
        } => translate(&store.load()?, &text, context.as_deref(), engine.as_deref(), &follow_ups).await,
        Command::Engines { word, sentence } => {
            let kind = match (word, sentence) {
                (false, true) => QueryKind::Sentence,
                _ => QueryKind::Word,
            };
            let registry = EngineRegistry::from_setting(&store.load()?);
            for item in registry.engines_for(kind) {
                let mark = if item.checked { "*" } else { " " };
                println!("{} {:<16} {}", mark, item.value, item.name);
            }
            Ok(())
        }
        Command::Config { action } => match action {
            ConfigAction::Path => {
                println!("{}", store.path().display());
                Ok(())
            }
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&store.load()?)?);
                Ok(())
            }
            ConfigAction::Set { key, value } => {
                let patch = parse_patch(&key, &value)?;
                store.update(patch)?;
                tracing::info!(key = %key, "setting updated");
                Ok(())
            }
        },
    }
}

async fn translate(
    setting: &Setting,
    text: &str,
    context: Option<&str>,
    engine: Option<&str>,
    follow_ups: &[String],
) -> Result<()> {
    let mut pane = ResultPane::new(EngineRegistry::from_setting(setting)).with_notifier(Arc::new(LogNotifier));
    let context = context.unwrap_or(text);
    let turn = match engine {
        Some(id) => pane.show_with(text, context, id),
        None => pane.show(text, context),
    };
    let Some(turn) = turn else {
        bail!("nothing to translate with engine '{}'", engine.unwrap_or("default"));
    };

    let mut out = std::io::stdout().lock();
    render::print_turn(turn, &mut out).await?;
    for question in follow_ups {
        writeln!(out, "\n> {}", question)?;
        if let Some(turn) = pane.ask(question) {
            render::print_turn(turn, &mut out).await?;
        }
    }
    pane.close();
    Ok(())
}

/// One-field settings patch. The value is taken as a plain string first; when the
/// field wants another type it is read as JSON.
fn parse_patch(key: &str, value: &str) -> Result<Setting> {
    let patch = match patch_from(key, serde_json::Value::String(value.to_string())) {
        Ok(patch) => patch,
        Err(as_string) => {
            let Ok(json) = serde_json::from_str(value) else {
                return Err(as_string).with_context(|| format!("invalid value for '{}'", key));
            };
            patch_from(key, json).with_context(|| format!("invalid value for '{}'", key))?
        }
    };
    if patch == Setting::default() {
        bail!("unknown setting '{}'", key);
    }
    Ok(patch)
}

fn patch_from(key: &str, value: serde_json::Value) -> serde_json::Result<Setting> {
    let mut object = serde_json::Map::new();
    object.insert(key.to_string(), value);
    serde_json::from_value(serde_json::Value::Object(object))
}
