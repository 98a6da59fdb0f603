use std::path::PathBuf;

/// Configuration for the file-backed settings store.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Settings file (default: "./adgate-settings.bin")
    pub path: PathBuf,

    /// Write the file on every changed update (default: true).
    /// When false, changes stay in memory until `FileStore::flush`.
    pub write_through: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./adgate-settings.bin"),
            write_through: true,
        }
    }
}

impl PersistenceConfig {
    /// Write-through config for the given file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Buffer changes in memory until an explicit flush.
    pub fn buffered(mut self) -> Self {
        self.write_through = false;
        self
    }
}
