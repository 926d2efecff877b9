use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::trace;

use crate::{
    Result,
    store::{KvStore, map_store_err},
};

/// Key-value store keeping one `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) the store directory.
    pub fn new<T: AsRef<Path>>(dir: T) -> Result<Self> {
        fs::create_dir_all(dir.as_ref()).map_err(map_store_err)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a key to its file. `[A-Za-z0-9_-]` is kept, every other byte is
    /// written as `%XX`, so distinct keys never share a file.
    fn path_for(
        &self,
        key: &str,
    ) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{:02X}", byte));
            }
        }
        self.dir.join(format!("{}.json", name))
    }
}

impl KvStore for FileStore {
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>> {
        let path = self.path_for(key);
        trace!("file_store::get({:?})", path);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_store_err(e)),
        }
    }

    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let path = self.path_for(key);
        trace!("file_store::set({:?})", path);
        // write-then-rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(map_store_err)?;
        fs::rename(&tmp, &path).map_err(map_store_err)
    }

    fn remove(
        &self,
        key: &str,
    ) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_store_err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FileStore {
        let dir = std::env::temp_dir().join(format!("diagflow-test-{}", nanoid::nanoid!(8)));
        FileStore::new(dir).unwrap()
    }

    #[test]
    fn test_file_store_round_trip() {
        let store = temp_store();
        assert_eq!(store.get("workflow_user_templates").unwrap(), None);

        store.set("workflow_user_templates", "[]").unwrap();
        assert_eq!(store.get("workflow_user_templates").unwrap().as_deref(), Some("[]"));
        assert!(store.dir().join("workflow_user_templates.json").exists());

        store.remove("workflow_user_templates").unwrap();
        store.remove("workflow_user_templates").unwrap();
        assert_eq!(store.get("workflow_user_templates").unwrap(), None);

        fs::remove_dir_all(store.dir()).unwrap();
    }

    #[test]
    fn test_keys_are_sanitized() {
        let store = temp_store();
        store.set("../escape/key", "1").unwrap();
        assert!(store.dir().join("%2E%2E%2Fescape%2Fkey.json").exists());
        assert_eq!(store.get("../escape/key").unwrap().as_deref(), Some("1"));

        fs::remove_dir_all(store.dir()).unwrap();
    }

    #[test]
    fn test_similar_keys_do_not_collide() {
        let store = temp_store();
        store.set("a/b", "slash").unwrap();
        store.set("a.b", "dot").unwrap();
        store.set("a_b", "underscore").unwrap();

        assert_eq!(store.get("a/b").unwrap().as_deref(), Some("slash"));
        assert_eq!(store.get("a.b").unwrap().as_deref(), Some("dot"));
        assert_eq!(store.get("a_b").unwrap().as_deref(), Some("underscore"));

        fs::remove_dir_all(store.dir()).unwrap();
    }
}
