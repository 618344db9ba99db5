//! Persisted home page lookup caches
//!
//! Two small caches survive restarts: which icon URL a home page uses, and
//! which home pages are known to have no icon at all. Each cache is loaded once
//! at startup and written back with a trailing debounce: the first change arms
//! a save, later changes ride along with it.

use crate::error::{FaviconError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Home page URL → icon URL
pub type HomePageToFaviconUrl = BTreeMap<String, String>;

/// Home page URLs whose icon search came up empty
pub type HomePagesWithoutFavicon = BTreeSet<String>;

/// Identifies one of the two lookup caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    HomePageToFaviconUrl,
    HomePagesWithoutFavicon,
}

impl CacheKind {
    /// File name of the cache inside the cache directory
    pub fn file_name(&self) -> &'static str {
        match self {
            CacheKind::HomePageToFaviconUrl => "HomePageToFaviconURLCache",
            CacheKind::HomePagesWithoutFavicon => "HomePageURLsWithNoFaviconURLCache",
        }
    }
}

/// Number of entries, reported when a cache is saved
pub trait CacheEntries {
    fn entry_count(&self) -> usize;
}

impl CacheEntries for HomePageToFaviconUrl {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

impl CacheEntries for HomePagesWithoutFavicon {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

/// An in-memory cache plus the bookkeeping for writing it back
#[derive(Debug)]
pub struct PersistedCache<T> {
    kind: CacheKind,
    path: PathBuf,
    value: T,
    dirty: bool,
    save_scheduled: bool,
}

impl<T> PersistedCache<T>
where
    T: Serialize + DeserializeOwned + Default + CacheEntries,
{
    /// Load the cache from `dir`; a missing or unreadable file yields an empty cache
    pub fn load(kind: CacheKind, dir: &Path) -> Self {
        let path = dir.join(kind.file_name());
        let value = match read_snapshot(&path) {
            Ok(Some(value)) => {
                debug!(cache = kind.file_name(), "Loaded lookup cache");
                value
            }
            Ok(None) => T::default(),
            Err(e) => {
                warn!(cache = kind.file_name(), error = %e, "Discarding unreadable lookup cache");
                T::default()
            }
        };

        Self {
            kind,
            path,
            value,
            dirty: false,
            save_scheduled: false,
        }
    }

    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply `mutate`, which reports whether it changed anything
    ///
    /// Returns `true` when the caller must arm a save timer: the cache just
    /// became dirty and no save is pending.
    pub fn update(&mut self, mutate: impl FnOnce(&mut T) -> bool) -> bool {
        if !mutate(&mut self.value) {
            return false;
        }
        self.dirty = true;
        if self.save_scheduled {
            return false;
        }
        self.save_scheduled = true;
        true
    }

    /// The armed save timer fired
    pub fn save_due(&mut self) -> Option<Result<PendingWrite>> {
        self.save_scheduled = false;
        self.take_write()
    }

    /// Serialize the current contents if there is anything unsaved
    ///
    /// The dirty flag is cleared here, before the write happens. A failed
    /// write is therefore not retried until the next change.
    pub fn take_write(&mut self) -> Option<Result<PendingWrite>> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;

        let write = bincode::serialize(&self.value)
            .map_err(FaviconError::from)
            .map(|data| PendingWrite {
                kind: self.kind,
                path: self.path.clone(),
                data,
                entries: self.value.entry_count(),
            });
        Some(write)
    }
}

/// A serialized snapshot waiting to be written
#[derive(Debug)]
pub struct PendingWrite {
    pub kind: CacheKind,
    pub path: PathBuf,
    pub data: Vec<u8>,
    pub entries: usize,
}

impl PendingWrite {
    /// Write the snapshot atomically
    ///
    /// Each write goes through its own temp file in the target directory, so
    /// readers only ever see a complete snapshot.
    pub fn write(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&self.data)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        debug!(
            cache = self.kind.file_name(),
            entries = self.entries,
            "Saved lookup cache"
        );
        Ok(())
    }
}

fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(bincode::deserialize(&data)?))
}
