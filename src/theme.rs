//! Theme Preference
//!
//! The dashboard colour scheme, persisted to a small JSON preferences file
//! so it survives restarts.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::notify::NotificationCenter;

/// Dashboard colour scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Icon for the button that switches away from this theme
    pub fn toggle_icon(&self) -> &'static str {
        match self {
            Theme::Dark => "fa-sun",
            Theme::Light => "fa-moon",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(default)]
    theme: Option<Theme>,
}

/// Theme persistence errors
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("Failed to access preferences {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed preferences {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and writes the preferences file
#[derive(Debug, Clone)]
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored theme, `None` if the file does not exist or names no theme
    pub fn load(&self) -> Result<Option<Theme>, ThemeError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ThemeError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let prefs: Preferences =
            serde_json::from_str(&content).map_err(|source| ThemeError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(prefs.theme)
    }

    pub fn save(&self, theme: Theme) -> Result<(), ThemeError> {
        let io_err = |source| ThemeError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let prefs = Preferences { theme: Some(theme) };
        let content = serde_json::to_string_pretty(&prefs).map_err(|source| ThemeError::Parse {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, content).map_err(io_err)
    }
}

/// Current theme plus its persistence
pub struct ThemeManager {
    store: ThemeStore,
    current: RwLock<Theme>,
    notifications: NotificationCenter,
}

impl ThemeManager {
    pub fn new(store: ThemeStore, notifications: NotificationCenter) -> Self {
        Self {
            store,
            current: RwLock::new(Theme::default()),
            notifications,
        }
    }

    /// Load the stored theme. A missing or unreadable file yields dark.
    pub fn init(&self) -> Theme {
        let theme = match self.store.load() {
            Ok(theme) => theme.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring stored theme");
                Theme::default()
            }
        };
        *self.current.write() = theme;
        tracing::debug!(theme = %theme, "Theme initialized");
        theme
    }

    pub fn current(&self) -> Theme {
        *self.current.read()
    }

    /// Apply and persist `theme`
    pub fn set(&self, theme: Theme) -> Result<(), ThemeError> {
        *self.current.write() = theme;
        self.store.save(theme)
    }

    /// Switch to the other theme, persist it and tell the user
    pub fn toggle(&self) -> Result<Theme, ThemeError> {
        let next = self.current().toggled();
        self.set(next)?;
        self.notifications.info(format!("Switched to {} theme", next));
        Ok(next)
    }

    pub fn store(&self) -> &ThemeStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;
    use std::time::Duration;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> (ThemeManager, NotificationCenter) {
        let center = NotificationCenter::with_tracing(Duration::ZERO);
        let store = ThemeStore::new(dir.path().join("prefs").join("preferences.json"));
        (ThemeManager::new(store, center.clone()), center)
    }

    #[test]
    fn test_init_defaults_to_dark() {
        let dir = TempDir::new().unwrap();
        let (themes, _) = manager(&dir);
        assert_eq!(themes.init(), Theme::Dark);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_dark() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = ThemeStore::new(&path);
        assert!(matches!(store.load(), Err(ThemeError::Parse { .. })));

        let themes = ThemeManager::new(store, NotificationCenter::with_tracing(Duration::ZERO));
        assert_eq!(themes.init(), Theme::Dark);
    }

    #[test]
    fn test_set_persists() {
        let dir = TempDir::new().unwrap();
        let (themes, _) = manager(&dir);
        themes.set(Theme::Light).unwrap();

        let (reloaded, _) = manager(&dir);
        assert_eq!(reloaded.init(), Theme::Light);

        let raw = std::fs::read_to_string(themes.store().path()).unwrap();
        assert!(raw.contains("\"light\""));
    }

    #[tokio::test]
    async fn test_toggle_notifies() {
        let dir = TempDir::new().unwrap();
        let (themes, center) = manager(&dir);
        themes.init();

        assert_eq!(themes.toggle().unwrap(), Theme::Light);
        assert_eq!(themes.toggle().unwrap(), Theme::Dark);

        let records = center.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "Switched to light theme");
        assert_eq!(records[1].message, "Switched to dark theme");
        assert!(records.iter().all(|r| r.severity == Severity::Info));
        assert_eq!(ThemeStore::new(themes.store().path()).load().unwrap(), Some(Theme::Dark));
    }

    #[test]
    fn test_toggle_without_runtime() {
        let dir = TempDir::new().unwrap();
        let center = NotificationCenter::with_tracing(Duration::from_millis(3000));
        let store = ThemeStore::new(dir.path().join("preferences.json"));
        let themes = ThemeManager::new(store, center.clone());

        assert_eq!(themes.toggle().unwrap(), Theme::Light);
        assert_eq!(center.len(), 1);
    }

    #[test]
    fn test_toggle_icon() {
        assert_eq!(Theme::Dark.toggle_icon(), "fa-sun");
        assert_eq!(Theme::Light.toggle_icon(), "fa-moon");
    }
}
