//! JSON-file-per-key state store, rooted in the user's XDG state directory.
//!
//! Corrupt or missing files load as `None` rather than failing the
//! workflow — persistence is best-effort scaffolding under the checkpoint
//! and approval managers, not a transactional database.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

pub struct StateStore {
    state_dir: PathBuf,
}

impl StateStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Resolve the default state directory: `$XDG_STATE_HOME/selfassembler`,
    /// falling back to `~/.local/state/selfassembler`.
    pub fn default_state_dir() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("", "", "selfassembler") {
            return dirs.state_dir().map(Path::to_path_buf).unwrap_or_else(|| {
                dirs.data_dir().to_path_buf()
            });
        }
        std::env::var_os("XDG_STATE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                directories::BaseDirs::new()
                    .map(|d| d.home_dir().join(".local").join("state"))
                    .unwrap_or_else(|| PathBuf::from(".local/state"))
            })
            .join("selfassembler")
    }

    pub fn with_default_dir() -> Self {
        Self::new(Self::default_state_dir())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.state_dir.join(format!("{key}.json"))
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        std::fs::write(self.path_for(key), json)?;
        Ok(())
    }

    /// Returns `None` on a missing or corrupt file — never fails the workflow.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = std::fs::read_to_string(self.path_for(key)).ok()?;
        serde_json::from_str(&data).ok()
    }

    pub fn delete(&self, key: &str) -> bool {
        std::fs::remove_file(self.path_for(key)).is_ok()
    }

    /// Keys (without the `.json` suffix) whose stem starts with `prefix`, sorted.
    pub fn list_keys(&self, prefix: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.state_dir) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
            .filter_map(|e| e.path().file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .filter(|stem| stem.starts_with(prefix))
            .collect();
        keys.sort();
        keys
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let widget = Widget {
            name: "gear".to_string(),
            count: 3,
        };
        store.save("widget_1", &widget).unwrap();
        let loaded: Widget = store.load("widget_1").unwrap();
        assert_eq!(loaded, widget);
    }

    #[test]
    fn load_missing_key_returns_none() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let loaded: Option<Widget> = store.load("missing");
        assert!(loaded.is_none());
    }

    #[test]
    fn load_corrupt_file_returns_none_not_error() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not valid json").unwrap();
        let loaded: Option<Widget> = store.load("broken");
        assert!(loaded.is_none());
    }

    #[test]
    fn delete_removes_file_and_reports_existence() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save("widget_1", &Widget { name: "a".into(), count: 1 }).unwrap();
        assert!(store.delete("widget_1"));
        assert!(!store.delete("widget_1"));
    }

    #[test]
    fn list_keys_filters_by_prefix_and_sorts() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save("checkpoint_b", &1).unwrap();
        store.save("checkpoint_a", &2).unwrap();
        store.save("other_thing", &3).unwrap();
        let keys = store.list_keys("checkpoint_");
        assert_eq!(keys, vec!["checkpoint_a", "checkpoint_b"]);
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("deeper");
        let store = StateStore::new(&nested);
        store.save("k", &42).unwrap();
        let loaded: Option<i32> = store.load("k");
        assert_eq!(loaded, Some(42));
    }
}
