//! Blob Store Implementation backed by the file system

use bridge_traits::{
    error::{BridgeError, Result},
    storage::BlobStore,
};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// File-backed blob store
///
/// Each key is stored in its own file named after the SHA-256 of the key, so
/// arbitrary URLs map onto safe, fixed-length file names. Writes go to a
/// temporary file that is renamed into place; a reader never sees a partial
/// icon.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(path = ?root, "Opened blob store");
        Ok(Self { root })
    }

    /// Create a store in the platform cache directory
    pub fn in_default_location() -> Result<Self> {
        let root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("favicon-core")
            .join("Favicons");
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.root.join(name)
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(data) => {
                debug!(key = %key, size = data.len(), "Blob store hit");
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.path_for(key);
        atomic_write(&path, &data)?;
        debug!(key = %key, size = data.len(), "Stored blob");
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).is_file())
    }
}

/// Write to a uniquely named sibling temp file, then rename over the destination
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path().join("Favicons")).unwrap();

        store
            .put("https://example.com/favicon.ico", Bytes::from_static(b"icon"))
            .unwrap();

        assert_eq!(
            store.get("https://example.com/favicon.ico").unwrap(),
            Some(Bytes::from_static(b"icon"))
        );
        assert!(store.contains("https://example.com/favicon.ico").unwrap());
    }

    #[test]
    fn test_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path()).unwrap();

        assert_eq!(store.get("https://example.com/nothing.png").unwrap(), None);
        assert!(!store.contains("https://example.com/nothing.png").unwrap());
    }

    #[test]
    fn test_keys_map_to_hashed_file_names() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path()).unwrap();

        let path = store.path_for("https://example.com/a?b=c/../d");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileBlobStore::new(dir.path()).unwrap();
            store.put("key", Bytes::from_static(b"persisted")).unwrap();
        }

        let reopened = FileBlobStore::new(dir.path()).unwrap();
        assert_eq!(
            reopened.get("key").unwrap(),
            Some(Bytes::from_static(b"persisted"))
        );
    }
}
