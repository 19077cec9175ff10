use std::path::PathBuf;

use super::{KeyValueStore, StorageError};

/// One file per key under `base`. Writes go to a temp file and are renamed into place.
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        FileStore { base }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base.join(format!("{}.json", key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.base.join(format!(".{}.json.tmp", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.key_path(key);

        if !path.exists() {
            return Ok(None);
        }

        Ok(Some(std::fs::read(path)?))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.base)?;

        let temp = self.temp_path(key);
        std::fs::write(&temp, value)?;
        std::fs::rename(temp, self.key_path(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key);

        if !path.exists() {
            return Ok(());
        }

        std::fs::remove_file(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state"));

        assert_eq!(store.get("queue").unwrap(), None);

        store.set("queue", b"[1,2,3]").unwrap();
        assert_eq!(store.get("queue").unwrap().as_deref(), Some(&b"[1,2,3]"[..]));

        store.set("queue", b"[]").unwrap();
        assert_eq!(store.get("queue").unwrap().as_deref(), Some(&b"[]"[..]));
        assert!(!dir.path().join("state/.queue.json.tmp").exists());

        store.remove("queue").unwrap();
        assert_eq!(store.get("queue").unwrap(), None);
        store.remove("queue").unwrap();
    }

    #[test]
    fn test_data_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        FileStore::new(dir.path().to_path_buf())
            .set("last_position", b"{}")
            .unwrap();

        let reopened = FileStore::new(dir.path().to_path_buf());
        assert!(reopened.get("last_position").unwrap().is_some());
    }
}
