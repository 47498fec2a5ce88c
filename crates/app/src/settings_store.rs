//! Settings persisted as one JSON file in the user's config directory.

use shared::collaborators::{SettingsError, SettingsStore};
use shared::settings::Setting;
use std::fs;
use std::path::{Path, PathBuf};

pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `settings.json` under the platform config directory.
    pub fn from_project_dirs() -> Result<Self, SettingsError> {
        let proj = directories::ProjectDirs::from("com.local", "Lingo", "Lingo")
            .ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(proj.config_dir().join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, setting: &Setting) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;
        }
        let json = serde_json::to_vec_pretty(setting)?;
        fs::write(&self.path, json).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    /// A missing file reads as the defaults.
    fn load(&self) -> Result<Setting, SettingsError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Setting::default()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn update(&self, patch: Setting) -> Result<Setting, SettingsError> {
        let mut setting = self.load()?;
        setting.merge(patch);
        self.save(&setting)?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(setting)
    }
}
