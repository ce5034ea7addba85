use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use std::{
    fs,
    path::PathBuf,
    sync::Mutex,
};

use crate::model::ForecastDay;

/// The forecast dataset queried by presentation code.
///
/// `replace_all` substitutes the entire dataset in one logical step: readers
/// observe either the old complete set or the new one, never a gap between a
/// delete and an insert.
pub trait ForecastStore: Send + Sync {
    fn replace_all(&self, days: Vec<ForecastDay>) -> Result<()>;

    /// Days dated `from` or later, ordered by date ascending.
    fn query_from(&self, from: i64) -> Result<Vec<ForecastDay>>;

    fn delete_all(&self) -> Result<()>;
}

fn sorted_from(days: &[ForecastDay], from: i64) -> Vec<ForecastDay> {
    let mut out: Vec<ForecastDay> =
        days.iter().filter(|d| d.date >= from).cloned().collect();
    out.sort_by_key(|d| d.date);
    out
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    days: Mutex<Vec<ForecastDay>>,
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ForecastDay>> {
        self.days.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ForecastStore for MemoryStore {
    fn replace_all(&self, days: Vec<ForecastDay>) -> Result<()> {
        *self.lock() = days;
        Ok(())
    }

    fn query_from(&self, from: i64) -> Result<Vec<ForecastDay>> {
        Ok(sorted_from(&self.lock(), from))
    }

    fn delete_all(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
}

/// Forecast dataset persisted as JSON in the platform data directory.
///
/// Replacement writes a temp file and renames it over the old one, so a
/// concurrent reader of the file sees a complete old or new dataset.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cached: Mutex<Vec<ForecastDay>>,
}

impl FileStore {
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open(path: PathBuf) -> Result<Self> {
        let days = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read forecast file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse forecast file: {}", path.display()))?
        } else {
            Vec::new()
        };

        Ok(Self { path, cached: Mutex::new(days) })
    }

    /// Path to the forecast data file.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))?;

        Ok(dirs.data_dir().join("forecast.json"))
    }

    fn persist(&self, days: &[ForecastDay]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string(days).context("Failed to serialize forecast data")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write forecast file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace forecast file: {}", self.path.display()))?;

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ForecastDay>> {
        self.cached.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ForecastStore for FileStore {
    fn replace_all(&self, days: Vec<ForecastDay>) -> Result<()> {
        let mut cached = self.lock();
        self.persist(&days)?;
        *cached = days;
        Ok(())
    }

    fn query_from(&self, from: i64) -> Result<Vec<ForecastDay>> {
        Ok(sorted_from(&self.lock(), from))
    }

    fn delete_all(&self) -> Result<()> {
        let mut cached = self.lock();
        self.persist(&[])?;
        cached.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::DAY_MILLIS;
    use tempfile::TempDir;

    fn day(date: i64) -> ForecastDay {
        ForecastDay {
            date,
            pressure: 1000.0,
            humidity: 50.0,
            wind_speed: 3.0,
            wind_direction: 90.0,
            high_temp: 12.0,
            low_temp: 4.0,
            condition_id: 800,
        }
    }

    #[test]
    fn replace_all_discards_previous_dataset() {
        let store = MemoryStore::default();
        store.replace_all(vec![day(0), day(DAY_MILLIS)]).unwrap();
        store.replace_all(vec![day(2 * DAY_MILLIS)]).unwrap();

        let days = store.query_from(0).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, 2 * DAY_MILLIS);
    }

    #[test]
    fn query_from_filters_and_sorts_ascending() {
        let store = MemoryStore::default();
        store
            .replace_all(vec![day(2 * DAY_MILLIS), day(0), day(DAY_MILLIS)])
            .unwrap();

        let days = store.query_from(DAY_MILLIS).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, DAY_MILLIS);
        assert_eq!(days[1].date, 2 * DAY_MILLIS);
    }

    #[test]
    fn delete_all_empties_the_store() {
        let store = MemoryStore::default();
        store.replace_all(vec![day(0)]).unwrap();
        store.delete_all().unwrap();
        assert!(store.query_from(0).unwrap().is_empty());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("forecast.json");

        let store = FileStore::open(path.clone()).expect("open");
        store.replace_all(vec![day(0), day(DAY_MILLIS)]).unwrap();

        let reopened = FileStore::open(path).expect("reopen");
        let days = reopened.query_from(0).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0], day(0));
    }

    #[test]
    fn file_store_replace_is_complete_old_or_new() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("forecast.json");

        let store = FileStore::open(path.clone()).expect("open");
        store.replace_all(vec![day(0)]).unwrap();
        store.replace_all(vec![day(DAY_MILLIS), day(2 * DAY_MILLIS)]).unwrap();

        // No .tmp remnant, and the file holds exactly the new set.
        assert!(!path.with_extension("json.tmp").exists());
        let reopened = FileStore::open(path).expect("reopen");
        assert_eq!(reopened.query_from(0).unwrap().len(), 2);
    }
}
