//! Read-only settings access
//!
//! The flow never writes settings. Stores report `None` for keys that were
//! never set; [`Defaults`] fills the gaps.

use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULTS_FILE: &str = "defaults.json";

/// Source of persisted settings
pub trait ConfigStore: Send + Sync {
    fn view_only(&self) -> Option<bool>;
    fn start_on_boot(&self) -> Option<bool>;
    fn access_key(&self) -> Option<String>;
}

/// Fallback values for unset settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub view_only: bool,
    pub start_on_boot: bool,
    pub access_key: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            view_only: false,
            start_on_boot: true,
            access_key: String::new(),
        }
    }
}

impl Defaults {
    /// Load defaults from a JSON file, falling back to built-ins when absent
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::config_invalid(&path.display().to_string(), &e.to_string()))
    }
}

/// Settings resolved against defaults, taken once at flow start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub view_only: bool,
    pub start_on_boot: bool,
}

impl ConfigSnapshot {
    pub fn read(store: &dyn ConfigStore, defaults: &Defaults) -> Self {
        Self {
            view_only: store.view_only().unwrap_or(defaults.view_only),
            start_on_boot: store.start_on_boot().unwrap_or(defaults.start_on_boot),
        }
    }
}

/// Current access key, read at the moment it is needed
pub fn access_key(store: &dyn ConfigStore, defaults: &Defaults) -> String {
    store
        .access_key()
        .unwrap_or_else(|| defaults.access_key.clone())
}

/// On-disk settings document. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_on_boot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
}

/// Settings backed by `settings.json` in a directory, re-read on every access
pub struct JsonConfigStore {
    dir: PathBuf,
}

impl JsonConfigStore {
    /// Store rooted at `~/.grantflow`
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| Error::new(crate::ErrorCode::Io, "HOME not set"))?;
        Self::with_dir(PathBuf::from(home).join(".grantflow"))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    /// Defaults from `defaults.json` beside the settings file
    pub fn defaults(&self) -> Result<Defaults> {
        Defaults::load(self.dir.join(DEFAULTS_FILE))
    }

    pub fn load(&self) -> Result<Settings> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::config_invalid(&path.display().to_string(), &e.to_string()))
    }

    /// Only used by tooling; the flow itself never writes
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let raw = serde_json::to_string_pretty(settings)?;
        fs::write(self.settings_path(), raw)?;
        Ok(())
    }

    fn read_or_warn(&self) -> Settings {
        match self.load() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable settings, using defaults");
                Settings::default()
            }
        }
    }
}

impl ConfigStore for JsonConfigStore {
    fn view_only(&self) -> Option<bool> {
        self.read_or_warn().view_only
    }

    fn start_on_boot(&self) -> Option<bool> {
        self.read_or_warn().start_on_boot
    }

    fn access_key(&self) -> Option<String> {
        self.read_or_warn().access_key
    }
}

/// In-process settings, for embedding hosts and tests
#[derive(Default)]
pub struct MemoryConfigStore {
    settings: RwLock<Settings>,
}

impl MemoryConfigStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings.write());
    }
}

impl ConfigStore for MemoryConfigStore {
    fn view_only(&self) -> Option<bool> {
        self.settings.read().view_only
    }

    fn start_on_boot(&self) -> Option<bool> {
        self.settings.read().start_on_boot
    }

    fn access_key(&self) -> Option<String> {
        self.settings.read().access_key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_falls_back_to_defaults() {
        let store = MemoryConfigStore::default();
        let snap = ConfigSnapshot::read(&store, &Defaults::default());
        assert!(!snap.view_only);
        assert!(snap.start_on_boot);
        assert_eq!(access_key(&store, &Defaults::default()), "");
    }

    #[test]
    fn stored_values_win_over_defaults() {
        let store = MemoryConfigStore::new(Settings {
            view_only: Some(true),
            start_on_boot: Some(false),
            access_key: Some("k1".into()),
        });
        let snap = ConfigSnapshot::read(&store, &Defaults::default());
        assert!(snap.view_only);
        assert!(!snap.start_on_boot);
        assert_eq!(access_key(&store, &Defaults::default()), "k1");
    }

    #[test]
    fn json_store_reads_fresh_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonConfigStore::with_dir(dir.path()).unwrap();
        assert_eq!(store.access_key(), None);

        store
            .save(&Settings {
                access_key: Some("secret".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(store.access_key().as_deref(), Some("secret"));
        assert_eq!(store.view_only(), None);
    }

    #[test]
    fn defaults_file_overrides_builtins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DEFAULTS_FILE),
            r#"{"start_on_boot": false, "access_key": "dflt"}"#,
        )
        .unwrap();
        let store = JsonConfigStore::with_dir(dir.path()).unwrap();
        let defaults = store.defaults().unwrap();
        assert!(!defaults.start_on_boot);
        assert!(!defaults.view_only);
        assert_eq!(access_key(&store, &defaults), "dflt");
    }

    #[test]
    fn malformed_settings_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        let store = JsonConfigStore::with_dir(dir.path()).unwrap();
        let err = store.load().unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::ConfigInvalid);
        // getters degrade to unset instead of failing the flow
        assert_eq!(store.view_only(), None);
    }
}
