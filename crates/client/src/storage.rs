//! Persisted key-value slot holding the serialized cart.
//!
//! The slot is a synchronous get/set string store; the last write wins.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use thiserror::Error;

/// Fixed key the cart is persisted under.
pub const CART_STORAGE_KEY: &str = "@RocketShoes:cart";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Serialize(String),
    #[error("lock poisoned")]
    LockPoisoned,
}

/// Synchronous string slot store.
pub trait CartStorage: Send + Sync {
    /// Last value written under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: CartStorage + ?Sized> CartStorage for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// In-memory slot store.
///
/// Intended for tests/dev; contents die with the process.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    slots: RwLock<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot, e.g. with a cart written by a previous session.
    pub fn with_slot(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = Self::new();
        if let Ok(mut slots) = storage.slots.write() {
            slots.insert(key.into(), value.into());
        }
        storage
    }
}

impl CartStorage for InMemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.write().map_err(|_| StorageError::LockPoisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed slot store: one file per key under `dir`.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// reader never sees a half-written cart.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create storage directory at {:?}", dir))?;
        Ok(Self { dir })
    }

    /// Open the store under the OS app data directory:
    /// `{app_data_dir}/storefront/`.
    pub fn open_default() -> anyhow::Result<Self> {
        Self::open(default_storage_dir()?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl CartStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key);
        let tmp = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Resolve `{app_data_dir}/storefront`.
fn default_storage_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    Ok(base.join("storefront"))
}
