//! Persisted settings snapshot and stores.
//!
//! The cooldown registry does not own its persistence: it reads and rewrites a
//! settings document held by a [`SettingsStore`]. The document is treated as a
//! unit - every persist overwrites the whole snapshot. [`JsonFileStore`] is
//! the production store (one pretty-printed JSON document on disk, atomic
//! writes); tests substitute `test_utils::MemoryStore`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// One persisted cooldown record.
///
/// The field names `code`, `until`, `reason` are the on-disk contract and
/// must round-trip exactly. `code` stays a raw integer here so that records
/// with unknown codes survive serialization; membership is checked when the
/// registry loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRecord {
    pub code: i64,
    pub until: DateTime<Utc>,
    pub reason: String,
}

/// The full persisted configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    #[serde(default)]
    pub error_cooldowns: Vec<CooldownRecord>,
}

impl SettingsSnapshot {
    /// Find the record for a code, if present.
    #[must_use]
    pub fn find_cooldown(&self, code: i64) -> Option<&CooldownRecord> {
        self.error_cooldowns.iter().find(|r| r.code == code)
    }

    /// Overwrite the record for `code`, or append one if missing.
    pub fn upsert_cooldown(&mut self, code: i64, until: DateTime<Utc>, reason: &str) {
        if let Some(existing) = self.error_cooldowns.iter_mut().find(|r| r.code == code) {
            existing.until = until;
            existing.reason = reason.to_string();
        } else {
            self.error_cooldowns.push(CooldownRecord {
                code,
                until,
                reason: reason.to_string(),
            });
        }
    }

    /// Drop the record for `code`. Returns whether anything was removed.
    pub fn remove_cooldown(&mut self, code: i64) -> bool {
        let before = self.error_cooldowns.len();
        self.error_cooldowns.retain(|r| r.code != code);
        self.error_cooldowns.len() != before
    }
}

/// Callback invoked whenever the snapshot changes via any path.
pub type ChangeCallback = Box<dyn Fn() + Send + Sync>;

/// Read/write/subscribe surface over the persisted settings document.
///
/// Injected into the registry so tests can substitute a fake without touching
/// global state.
pub trait SettingsStore: Send + Sync {
    /// Current snapshot. Cheap; implementations hold the document in memory.
    fn current(&self) -> Result<SettingsSnapshot>;

    /// Atomically overwrite the persisted document with `snapshot`.
    ///
    /// Implementations fire change callbacks after a successful persist.
    fn persist(&self, snapshot: &SettingsSnapshot) -> Result<()>;

    /// Register a callback for snapshot changes (own writes and external
    /// reloads alike).
    fn on_change(&self, callback: ChangeCallback);
}

/// Settings store backed by a single JSON document on disk.
pub struct JsonFileStore {
    path: PathBuf,
    snapshot: RwLock<SettingsSnapshot>,
    callbacks: Mutex<Vec<ChangeCallback>>,
}

impl JsonFileStore {
    /// Open a store at `path`, loading the current document.
    ///
    /// A missing or empty file yields the default (empty) snapshot; the file
    /// is created on first persist.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let snapshot = Self::read_document(&path)?;
        debug!(
            path = %path.display(),
            cooldowns = snapshot.error_cooldowns.len(),
            "Opened settings store"
        );
        Ok(Arc::new(Self {
            path,
            snapshot: RwLock::new(snapshot),
            callbacks: Mutex::new(Vec::new()),
        }))
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the document from disk and notify subscribers.
    ///
    /// For when another process rewrote the file underneath us.
    pub fn reload(&self) -> Result<()> {
        let snapshot = Self::read_document(&self.path)?;
        *self.snapshot.write() = snapshot;
        debug!(path = %self.path.display(), "Reloaded settings from disk");
        self.notify();
        Ok(())
    }

    fn read_document(path: &Path) -> Result<SettingsSnapshot> {
        if !path.exists() {
            return Ok(SettingsSnapshot::default());
        }
        let raw = fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(SettingsSnapshot::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn notify(&self) {
        let callbacks = self.callbacks.lock();
        for callback in callbacks.iter() {
            callback();
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn current(&self) -> Result<SettingsSnapshot> {
        Ok(self.snapshot.read().clone())
    }

    fn persist(&self, snapshot: &SettingsSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_string_pretty(snapshot)?;

        // Write to temporary file first (atomic write)
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, payload)?;
        if let Err(err) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(err.into());
        }

        *self.snapshot.write() = snapshot.clone();
        debug!(
            path = %self.path.display(),
            cooldowns = snapshot.error_cooldowns.len(),
            "Persisted settings"
        );
        self.notify();
        Ok(())
    }

    fn on_change(&self, callback: ChangeCallback) {
        self.callbacks.lock().push(callback);
    }
}
