//! Session-scoped key-value storage
//!
//! The editor only needs an opaque per-browser-session map. Values are JSON
//! documents; keys are `/`-separated paths under the `dbedit/` namespace.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde_json::Value as JsonValue;

use crate::error::{ServiceError, ServiceResult};

pub const OBJECTS_PREFIX: &str = "dbedit/objects/";
pub const PARAMS_PREFIX: &str = "dbedit/params/";
pub const INITIAL_URI_PREFIX: &str = "dbedit/initial_uri/";

pub fn object_key(id: &str) -> String {
    format!("{}{}", OBJECTS_PREFIX, id)
}

pub fn params_key(id: &str) -> String {
    format!("{}{}", PARAMS_PREFIX, id)
}

pub fn initial_uri_key(id: &str) -> String {
    format!("{}{}", INITIAL_URI_PREFIX, id)
}

/// Storage belonging to one browser session
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> ServiceResult<Option<JsonValue>>;

    fn set(&self, key: &str, value: JsonValue) -> ServiceResult<()>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> ServiceResult<()>;

    /// All keys starting with `prefix`, in ascending order
    fn keys(&self, prefix: &str) -> ServiceResult<Vec<String>>;
}

/// Store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, JsonValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> ServiceResult<Option<JsonValue>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: JsonValue) -> ServiceResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> ServiceResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> ServiceResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Store persisted as one JSON document per browser session.
///
/// The document is loaded when the store is opened and rewritten after every
/// change. Concurrent requests of the same session follow last-write-wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, JsonValue>>,
}

impl FileStore {
    /// Open the store of `session_id` inside `dir`, creating the directory
    pub fn open(dir: impl AsRef<Path>, session_id: &str) -> ServiceResult<Self> {
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ServiceError::Store(format!(
                "invalid session id '{}'",
                session_id
            )));
        }

        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", session_id));

        let entries: BTreeMap<String, JsonValue> = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "discarding unreadable session file");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "opened session store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, JsonValue>) -> ServiceResult<()> {
        let text = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> ServiceResult<Option<JsonValue>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: JsonValue) -> ServiceResult<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> ServiceResult<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn keys(&self, prefix: &str) -> ServiceResult<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_keys_by_prefix() {
        let store = MemoryStore::new();
        store.set(&object_key("b"), json!(1)).unwrap();
        store.set(&object_key("a"), json!(2)).unwrap();
        store.set(&params_key("a"), json!({})).unwrap();

        assert_eq!(
            store.keys(OBJECTS_PREFIX).unwrap(),
            vec!["dbedit/objects/a", "dbedit/objects/b"]
        );
        store.remove(&object_key("a")).unwrap();
        store.remove(&object_key("missing")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_file_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), "abc123").unwrap();
            store.set(&initial_uri_key("x"), json!("/users?page=2")).unwrap();
        }
        let store = FileStore::open(dir.path(), "abc123").unwrap();
        assert_eq!(
            store.get(&initial_uri_key("x")).unwrap(),
            Some(json!("/users?page=2"))
        );
        assert!(store.path().ends_with("abc123.json"));
    }

    #[test]
    fn test_file_store_rejects_path_like_session_ids() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileStore::open(dir.path(), "../etc"),
            Err(ServiceError::Store(_))
        ));
        assert!(FileStore::open(dir.path(), "").is_err());
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s1.json"), "not json").unwrap();
        let store = FileStore::open(dir.path(), "s1").unwrap();
        assert!(store.keys("").unwrap().is_empty());
    }
}
