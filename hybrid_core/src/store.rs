//! Durable key-value stores with file locking.
//!
//! The persistence gateway writes one record under one fixed key. On disk
//! each key is its own JSON file, read under a shared lock and replaced
//! atomically under an exclusive lock.

use crate::{Error, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Byte-oriented durable store
pub trait KeyValueStore {
    /// Read a record; `Ok(None)` when the key has never been written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace a record entirely
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;
}

/// One file per key inside a data directory
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        // Acquire shared lock for reading
        file.lock_shared()?;

        let mut contents = Vec::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_end(&mut contents);
        file.unlock()?;
        read?;

        tracing::debug!("Read {} bytes from {:?}", contents.len(), path);
        Ok(Some(contents))
    }

    /// Atomically writes the record by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        let temp = NamedTempFile::new_in(&self.dir)?;

        // Acquire exclusive lock on the temp file to serialize concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(value)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        // Atomically replace old record
        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }
}

/// In-memory store with an optional byte quota
///
/// A write that would push the total stored size over the quota fails with
/// [`Error::Storage`] and leaves the store unchanged.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, Vec<u8>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            records: HashMap::new(),
            quota: Some(quota),
        }
    }

    fn used_excluding(&self, key: &str) -> usize {
        self.records
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        if let Some(quota) = self.quota {
            let needed = self.used_excluding(key) + value.len();
            if needed > quota {
                return Err(Error::Storage(format!(
                    "quota exceeded ({} bytes needed, {} available)",
                    needed, quota
                )));
            }
        }
        self.records.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
