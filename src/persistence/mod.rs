mod config;
mod file_store;
mod snapshot;

pub use config::PersistenceConfig;
pub use file_store::FileStore;
pub use snapshot::{
    read_snapshot, write_snapshot, SettingEntry, SettingsSnapshot, SNAPSHOT_MAGIC, SNAPSHOT_VERSION,
};
