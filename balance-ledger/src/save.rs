//! File-backed world save
//!
//! Reference host persistence layer. Each world keeps one JSON container at
//! `<data_dir>/<world>/<data_name>.json`:
//!
//! ```json
//! {
//!   "EconomyData": { "balances": [ { "identity": "...", "balance": 10.0 } ] },
//!   "last_saved": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! The ledger only owns the `balances` key; anything else in the file is
//! carried through untouched.

use crate::{
    error::{Error, Result},
    store::BalanceStore,
    types::WorldId,
    world::World,
    Config,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LAST_SAVED_KEY: &str = "last_saved";

/// World whose balances live in a JSON file on disk
#[derive(Debug)]
pub struct FileWorld {
    id: WorldId,
    path: PathBuf,
    data_name: String,
    store: Arc<BalanceStore>,
    // Host container as last read/written; also serializes flushes
    container: Mutex<Map<String, Value>>,
}

impl FileWorld {
    /// Open (or create) the save for `world` under `config.data_dir`.
    ///
    /// An unparseable save is a fatal error.
    pub fn open(config: &Config, world: impl Into<String>) -> Result<Self> {
        let id = WorldId::new(world);
        let path = config
            .data_dir
            .join(id.as_str())
            .join(format!("{}.json", config.data_name));

        let store = Arc::new(BalanceStore::new());
        let container = if path.exists() {
            let container = read_container(&path)?;
            match container.get(&config.data_name) {
                Some(Value::Object(data)) => store.read_from(data)?,
                Some(_) => {
                    return Err(Error::MalformedSnapshot(format!(
                        "{} in {:?} is not an object",
                        config.data_name, path
                    )))
                }
                None => {}
            }
            container
        } else {
            Map::new()
        };

        tracing::info!(
            world = %id,
            path = ?path,
            players = store.len(),
            "Opened world save"
        );

        Ok(Self {
            id,
            path,
            data_name: config.data_name.clone(),
            store,
            container: Mutex::new(container),
        })
    }

    /// Path of the save file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the save if the store has unsaved changes.
    ///
    /// Returns whether a write happened. On failure the store stays dirty.
    pub fn flush(&self) -> Result<bool> {
        let mut container = self.container.lock();
        if !self.store.take_dirty() {
            return Ok(false);
        }

        match self.write(&mut container) {
            Ok(()) => {
                tracing::info!(world = %self.id, players = self.store.len(), "Balances saved");
                Ok(true)
            }
            Err(e) => {
                self.store.mark_dirty();
                tracing::error!(world = %self.id, error = %e, "Failed to save balances");
                Err(e)
            }
        }
    }

    fn write(&self, container: &mut Map<String, Value>) -> Result<()> {
        let mut data = match container.remove(&self.data_name) {
            Some(Value::Object(data)) => data,
            _ => Map::new(),
        };
        self.store.write_to(&mut data)?;
        container.insert(self.data_name.clone(), Value::Object(data));
        container.insert(
            LAST_SAVED_KEY.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        // Write-then-rename so a crash never leaves a torn save
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&*container)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl World for FileWorld {
    fn id(&self) -> &WorldId {
        &self.id
    }

    fn balances(&self) -> Arc<BalanceStore> {
        self.store.clone()
    }
}

fn read_container(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read(path)?;
    match serde_json::from_slice::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::MalformedSnapshot(format!(
            "save file {:?} is not a JSON object",
            path
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerId;
    use serde_json::json;

    fn test_config(dir: &Path) -> Config {
        Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_open_missing_save_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let world = FileWorld::open(&test_config(temp_dir.path()), "world").unwrap();

        assert!(world.balances().is_empty());
        assert!(!world.path().exists());
        assert!(!world.flush().unwrap());
    }

    #[test]
    fn test_flush_and_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let alice = PlayerId::random();

        {
            let world = FileWorld::open(&config, "world").unwrap();
            assert!(world.balances().add_balance(alice, 250.0));
            assert!(world.flush().unwrap());
            // Nothing new to write
            assert!(!world.flush().unwrap());
        }

        let reopened = FileWorld::open(&config, "world").unwrap();
        assert_eq!(reopened.balances().balance(&alice), 250.0);
        assert!(!reopened.balances().is_dirty());
    }

    #[test]
    fn test_preserves_foreign_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let path = temp_dir.path().join("world").join("EconomyData.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            serde_json::to_vec(&json!({
                "EconomyData": { "balances": [], "shops": 3 },
                "other_mod": { "x": 1 }
            }))
            .unwrap(),
        )
        .unwrap();

        let world = FileWorld::open(&config, "world").unwrap();
        world.balances().add_balance(PlayerId::random(), 1.0);
        assert!(world.flush().unwrap());

        let saved: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved["other_mod"], json!({ "x": 1 }));
        assert_eq!(saved["EconomyData"]["shops"], json!(3));
        assert_eq!(saved["EconomyData"]["balances"].as_array().unwrap().len(), 1);
        assert!(saved[LAST_SAVED_KEY].is_string());
    }

    #[test]
    fn test_reads_legacy_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let path = temp_dir.path().join("world").join("EconomyData.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"EconomyData":{"balances":[{"uuid":"0f8fad5b-d9cb-469f-a165-70867728950e","balance":9.5}]}}"#,
        )
        .unwrap();

        let world = FileWorld::open(&config, "world").unwrap();
        let player: PlayerId = "0f8fad5b-d9cb-469f-a165-70867728950e".parse().unwrap();
        assert_eq!(world.balances().balance(&player), 9.5);
    }

    #[test]
    fn test_infinite_set_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let alice = PlayerId::random();

        {
            let world = FileWorld::open(&config, "world").unwrap();
            world.balances().set_balance(alice, f64::INFINITY);
            assert!(world.flush().unwrap());
        }

        let reopened = FileWorld::open(&config, "world").unwrap();
        assert_eq!(reopened.balances().balance(&alice), 0.0);
        assert!(reopened.balances().contains(&alice));
    }

    #[test]
    fn test_null_balance_in_save_is_clamped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let path = temp_dir.path().join("world").join("EconomyData.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"EconomyData":{"balances":[{"identity":"0f8fad5b-d9cb-469f-a165-70867728950e","balance":null}]}}"#,
        )
        .unwrap();

        let world = FileWorld::open(&config, "world").unwrap();
        let player: PlayerId = "0f8fad5b-d9cb-469f-a165-70867728950e".parse().unwrap();
        assert_eq!(world.balances().balance(&player), 0.0);
    }

    #[test]
    fn test_invalid_identity_fails_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let path = temp_dir.path().join("world").join("EconomyData.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"EconomyData":{"balances":[{"identity":"nope","balance":1.0}]}}"#,
        )
        .unwrap();

        let err = FileWorld::open(&config, "world").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentity { .. }));
    }

    #[test]
    fn test_non_object_save_fails_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let path = temp_dir.path().join("world").join("EconomyData.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = FileWorld::open(&config, "world").unwrap_err();
        assert!(matches!(err, Error::MalformedSnapshot(_)));
    }
}
