//! FileStore - settings store persisted to a single snapshot file.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::persistence::{read_snapshot, write_snapshot, PersistenceConfig, SettingsSnapshot};
use crate::settings::{MemoryStore, SettingsStore};
use crate::types::{Group, SettingValue};

/// Durable [`SettingsStore`]: a [`MemoryStore`] that rewrites its snapshot
/// file when values change.
///
/// Concurrent processes sharing one file are last-writer-wins.
pub struct FileStore {
    config: PersistenceConfig,
    memory: MemoryStore,
    /// Serialises file writes; also tracks unflushed changes.
    dirty: Mutex<bool>,
}

impl FileStore {
    /// Open the store, loading the file if present.
    ///
    /// A missing file opens empty. A damaged file is logged and opened
    /// empty so a bad settings file never blocks the caller; it is replaced
    /// on the next write. I/O failures and unsupported versions are errors.
    pub fn open(config: PersistenceConfig) -> Result<Self> {
        let memory = match read_snapshot(&config.path) {
            Ok(Some(snapshot)) => {
                debug!(
                    "Loaded {} settings from {:?}",
                    snapshot.entries.len(),
                    config.path
                );
                MemoryStore::from_entries(snapshot.entries.into_iter().map(|e| (e.key, e.value)))
            }
            Ok(None) => MemoryStore::new(),
            Err(Error::Corrupt(msg)) => {
                warn!("Settings file {:?} is corrupt ({}), starting empty", config.path, msg);
                MemoryStore::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            config,
            memory,
            dirty: Mutex::new(false),
        })
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Whether there are changes not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        *self.dirty.lock()
    }

    /// Write the current state to disk.
    pub fn flush(&self) -> Result<()> {
        let mut dirty = self.dirty.lock();
        let snapshot = SettingsSnapshot::new(self.memory.entries());
        let bytes = write_snapshot(&self.config.path, &snapshot)?;
        debug!("Wrote {} bytes of settings to {:?}", bytes, self.config.path);
        *dirty = false;
        Ok(())
    }

    /// Remove a key and persist the removal.
    pub fn remove(&self, key: &str, group: Group) -> Option<SettingValue> {
        let prev = self.memory.remove(key, group)?;
        self.mark_changed();
        Some(prev)
    }

    /// All stored entries, sorted by key.
    pub fn entries(&self) -> Vec<(crate::types::SettingKey, SettingValue)> {
        self.memory.entries()
    }

    /// Record a change and write through if configured.
    /// Returns false when the write failed.
    fn mark_changed(&self) -> bool {
        *self.dirty.lock() = true;
        if !self.config.write_through {
            return true;
        }
        match self.flush() {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write settings to {:?}: {}", self.config.path, e);
                false
            }
        }
    }
}

impl SettingsStore for FileStore {
    fn load(&self, key: &str, group: Group) -> Option<SettingValue> {
        self.memory.load(key, group)
    }

    fn update(&self, key: &str, group: Group, value: SettingValue) -> bool {
        if !self.memory.update(key, group, value) {
            return false;
        }
        self.mark_changed()
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if *self.dirty.get_mut() {
            if let Err(e) = self.flush() {
                warn!("Failed to flush settings on drop: {}", e);
            }
        }
    }
}
