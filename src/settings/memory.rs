use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::settings::SettingsStore;
use crate::types::{Group, SettingKey, SettingValue};

/// In-process settings store.
///
/// Backs tests and benches directly, and is the in-memory half of
/// [`FileStore`](crate::persistence::FileStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<FxHashMap<SettingKey, SettingValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (SettingKey, SettingValue)>) -> Self {
        Self {
            data: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Remove a key, returning the previous value.
    pub fn remove(&self, key: &str, group: Group) -> Option<SettingValue> {
        self.data.write().remove(&SettingKey::new(group, key))
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of all entries, sorted by key for stable output.
    pub fn entries(&self) -> Vec<(SettingKey, SettingValue)> {
        let mut entries: Vec<_> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, key: &str, group: Group) -> Option<SettingValue> {
        self.data.read().get(&SettingKey::new(group, key)).cloned()
    }

    fn update(&self, key: &str, group: Group, value: SettingValue) -> bool {
        let mut data = self.data.write();
        let key = SettingKey::new(group, key);
        if data.get(&key) == Some(&value) {
            return false;
        }
        data.insert(key, value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing() {
        let store = MemoryStore::new();
        assert_eq!(store.load("nope", Group::General), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_reports_change() {
        let store = MemoryStore::new();
        assert!(store.update("k", Group::General, SettingValue::Int(1)));
        assert!(!store.update("k", Group::General, SettingValue::Int(1)));
        assert!(store.update("k", Group::General, SettingValue::Int(2)));
        assert_eq!(store.load("k", Group::General), Some(SettingValue::Int(2)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_groups_are_separate() {
        let store = MemoryStore::new();
        store.update("k", Group::General, SettingValue::Int(1));
        store.update("k", Group::Privacy, SettingValue::Int(2));
        assert_eq!(store.load("k", Group::General), Some(SettingValue::Int(1)));
        assert_eq!(store.load("k", Group::Privacy), Some(SettingValue::Int(2)));
    }

    #[test]
    fn test_remove_and_entries() {
        let store = MemoryStore::from_entries([
            (SettingKey::new(Group::Privacy, "b"), SettingValue::Int(2)),
            (SettingKey::new(Group::General, "a"), SettingValue::Int(1)),
        ]);
        let entries = store.entries();
        assert_eq!(entries[0].0.name(), "a");
        assert_eq!(entries[1].0.name(), "b");

        assert_eq!(store.remove("a", Group::General), Some(SettingValue::Int(1)));
        assert_eq!(store.len(), 1);
    }
}
