//! Storage media for the persisted auth-state mirror.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth store writes through exactly one medium. Callers treat every
//! failure here as "nothing persisted": errors are returned so the store can
//! log them, never so it can refuse an in-memory change.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors produced by a persistence medium.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("storage read failed: {0}")]
    Read(String),
    #[error("storage write failed: {0}")]
    Write(String),
    #[error("storage remove failed: {0}")]
    Remove(String),
    #[error("stored value is not valid: {0}")]
    Decode(String),
}

/// A single slot holding the serialized auth state.
pub trait StatePersistence: Send + Sync {
    /// Read the raw slot contents. `Ok(None)` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Read`] if the medium is unavailable.
    fn load(&self) -> Result<Option<String>, PersistError>;

    /// Overwrite the slot.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Write`] if the medium rejects the write.
    fn save(&self, raw: &str) -> Result<(), PersistError>;

    /// Empty the slot. Removing an empty slot succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Remove`] if the medium rejects the removal.
    fn remove(&self) -> Result<(), PersistError>;
}

impl<T: StatePersistence + ?Sized> StatePersistence for Arc<T> {
    fn load(&self) -> Result<Option<String>, PersistError> {
        (**self).load()
    }

    fn save(&self, raw: &str) -> Result<(), PersistError> {
        (**self).save(raw)
    }

    fn remove(&self) -> Result<(), PersistError> {
        (**self).remove()
    }
}

/// Load and decode a JSON value from `medium`.
///
/// # Errors
///
/// Propagates read failures and reports undecodable contents as
/// [`PersistError::Decode`].
pub fn load_json<T: DeserializeOwned>(medium: &dyn StatePersistence) -> Result<Option<T>, PersistError> {
    let Some(raw) = medium.load()? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| PersistError::Decode(e.to_string()))
}

/// Encode `value` as JSON and write it to `medium`.
///
/// # Errors
///
/// Returns [`PersistError::Write`] if encoding or the write fails.
pub fn save_json<T: Serialize>(medium: &dyn StatePersistence, value: &T) -> Result<(), PersistError> {
    let raw = serde_json::to_string(value).map_err(|e| PersistError::Write(e.to_string()))?;
    medium.save(&raw)
}

// =============================================================================
// FILE
// =============================================================================

/// JSON file on local disk.
///
/// Writes go to a sibling temp file and are renamed into place, so a crash
/// mid-write leaves either the old or the new contents.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatePersistence for FilePersistence {
    fn load(&self) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::Read(e.to_string())),
        }
    }

    fn save(&self, raw: &str) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PersistError::Write(e.to_string()))?;
        }
        let temp = self.temp_path();
        fs::write(&temp, raw).map_err(|e| PersistError::Write(e.to_string()))?;
        fs::rename(&temp, &self.path).map_err(|e| PersistError::Write(e.to_string()))
    }

    fn remove(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::Remove(e.to_string())),
        }
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local slot. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<String>>,
}

impl MemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with `raw`, for seeding a rehydrate.
    #[must_use]
    pub fn with_contents(raw: impl Into<String>) -> Self {
        Self { slot: Mutex::new(Some(raw.into())) }
    }

    /// Current raw contents.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl StatePersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<String>, PersistError> {
        Ok(self.contents())
    }

    fn save(&self, raw: &str) -> Result<(), PersistError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(raw.to_owned());
        Ok(())
    }

    fn remove(&self) -> Result<(), PersistError> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        Ok(())
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
