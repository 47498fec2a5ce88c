//! Narrow interfaces to the things the popup core does not own: the settings
//! store, the background messaging channel and the toast surface.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::messaging::ExtensionMessage;
use crate::settings::Setting;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to access settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no configuration directory available")]
    NoConfigDir,
}

/// Key-value settings, read on mount and updated incrementally.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Setting, SettingsError>;

    /// Merge `patch` into the stored settings and return the result.
    fn update(&self, patch: Setting) -> Result<Setting, SettingsError>;
}

/// Settings held in memory only.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettings {
    inner: Arc<Mutex<Setting>>,
}

impl InMemorySettings {
    pub fn new(setting: Setting) -> Self {
        Self {
            inner: Arc::new(Mutex::new(setting)),
        }
    }
}

impl SettingsStore for InMemorySettings {
    fn load(&self) -> Result<Setting, SettingsError> {
        Ok(self.inner.lock().clone())
    }

    fn update(&self, patch: Setting) -> Result<Setting, SettingsError> {
        let mut guard = self.inner.lock();
        guard.merge(patch);
        Ok(guard.clone())
    }
}

/// Outgoing half of the cross-context message channel.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, message: ExtensionMessage) -> anyhow::Result<()>;
}

/// An error shown briefly to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
}

impl Toast {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Transient notification surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Writes toasts to the log instead of a screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        tracing::warn!(message = %toast.message, "toast");
    }
}

/// Keeps every toast it receives.
#[derive(Debug, Clone, Default)]
pub struct ToastLog {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl ToastLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }
}

impl Notifier for ToastLog {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }
}
