use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::Mutex,
};

use crate::model::Coordinates;

/// User preferences consumed and partially written by the sync core.
///
/// The core reads all of these; it writes only `coordinates` (after a fetch
/// that carried city coordinates) and `last_notified_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Free-text place name used when no resolved coordinates exist.
    pub place_name: String,

    /// Whether the user wants "new weather" notifications at all.
    pub notifications_enabled: bool,

    /// When the user was last notified, if ever.
    pub last_notified_at: Option<DateTime<Utc>>,

    /// Coordinates resolved from a previous successful fetch. Cleared when
    /// the place name changes so a stale pair cannot shadow the new name.
    /// Kept last so the TOML table serializes after the scalar fields.
    pub coordinates: Option<Coordinates>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            place_name: "London".to_string(),
            notifications_enabled: true,
            last_notified_at: None,
            coordinates: None,
        }
    }
}

/// Read/write access to persisted user preferences.
///
/// The presentation layer owns most writes; the sync core only stores resolved
/// coordinates and the notification timestamp.
pub trait PreferenceStore: Send + Sync {
    fn place_name(&self) -> Result<String>;
    fn set_place_name(&self, name: &str) -> Result<()>;

    fn coordinates(&self) -> Result<Option<Coordinates>>;
    fn set_coordinates(&self, coordinates: Coordinates) -> Result<()>;
    fn clear_coordinates(&self) -> Result<()>;

    fn notifications_enabled(&self) -> Result<bool>;
    fn set_notifications_enabled(&self, enabled: bool) -> Result<()>;

    fn last_notified_at(&self) -> Result<Option<DateTime<Utc>>>;
    fn set_last_notified_at(&self, at: DateTime<Utc>) -> Result<()>;
}

/// Preferences persisted as TOML in the platform config directory.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    cached: Mutex<Preferences>,
}

impl FilePreferences {
    /// Open (or initialize with defaults) the preference file at the platform
    /// config location.
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Open a preference file at an explicit path, creating defaults if the
    /// file does not exist yet.
    pub fn open(path: PathBuf) -> Result<Self> {
        let prefs = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse preferences file: {}", path.display()))?
        } else {
            Preferences::default()
        };

        Ok(Self { path, cached: Mutex::new(prefs) })
    }

    /// Path to the preferences file.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("preferences.toml"))
    }

    fn update(&self, apply: impl FnOnce(&mut Preferences)) -> Result<()> {
        let mut prefs = self.lock();
        apply(&mut prefs);
        self.persist(&prefs)
    }

    fn persist(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create preferences directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(prefs).context("Failed to serialize preferences to TOML")?;

        // Write-then-rename so readers never observe a half-written file.
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, toml)
            .with_context(|| format!("Failed to write preferences file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace preferences file: {}", self.path.display()))?;

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Preferences> {
        // Preferences are plain data; a poisoned lock only means another
        // thread panicked mid-update, and the data is still usable.
        self.cached.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStore for FilePreferences {
    fn place_name(&self) -> Result<String> {
        Ok(self.lock().place_name.clone())
    }

    fn set_place_name(&self, name: &str) -> Result<()> {
        self.update(|p| p.place_name = name.to_string())
    }

    fn coordinates(&self) -> Result<Option<Coordinates>> {
        Ok(self.lock().coordinates)
    }

    fn set_coordinates(&self, coordinates: Coordinates) -> Result<()> {
        self.update(|p| p.coordinates = Some(coordinates))
    }

    fn clear_coordinates(&self) -> Result<()> {
        self.update(|p| p.coordinates = None)
    }

    fn notifications_enabled(&self) -> Result<bool> {
        Ok(self.lock().notifications_enabled)
    }

    fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|p| p.notifications_enabled = enabled)
    }

    fn last_notified_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.lock().last_notified_at)
    }

    fn set_last_notified_at(&self, at: DateTime<Utc>) -> Result<()> {
        self.update(|p| p.last_notified_at = Some(at))
    }
}

/// In-memory preference store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    inner: Mutex<Preferences>,
}

impl MemoryPreferences {
    pub fn new(prefs: Preferences) -> Self {
        Self { inner: Mutex::new(prefs) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Preferences> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStore for MemoryPreferences {
    fn place_name(&self) -> Result<String> {
        Ok(self.lock().place_name.clone())
    }

    fn set_place_name(&self, name: &str) -> Result<()> {
        self.lock().place_name = name.to_string();
        Ok(())
    }

    fn coordinates(&self) -> Result<Option<Coordinates>> {
        Ok(self.lock().coordinates)
    }

    fn set_coordinates(&self, coordinates: Coordinates) -> Result<()> {
        self.lock().coordinates = Some(coordinates);
        Ok(())
    }

    fn clear_coordinates(&self) -> Result<()> {
        self.lock().coordinates = None;
        Ok(())
    }

    fn notifications_enabled(&self) -> Result<bool> {
        Ok(self.lock().notifications_enabled)
    }

    fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.lock().notifications_enabled = enabled;
        Ok(())
    }

    fn last_notified_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.lock().last_notified_at)
    }

    fn set_last_notified_at(&self, at: DateTime<Utc>) -> Result<()> {
        self.lock().last_notified_at = Some(at);
        Ok(())
    }
}
