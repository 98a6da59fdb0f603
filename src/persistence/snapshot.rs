use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{SettingKey, SettingValue};

/// Settings file magic bytes
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"AGST";

/// Settings file format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Complete settings state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// Timestamp when the snapshot was written (unix millis)
    pub saved_at: u64,
    /// Every stored key and value
    pub entries: Vec<SettingEntry>,
}

/// One stored setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingEntry {
    pub key: SettingKey,
    pub value: SettingValue,
}

impl SettingsSnapshot {
    pub fn new(entries: Vec<(SettingKey, SettingValue)>) -> Self {
        Self {
            saved_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            entries: entries
                .into_iter()
                .map(|(key, value)| SettingEntry { key, value })
                .collect(),
        }
    }
}

/// Write a snapshot atomically: temp file in the same directory, then rename.
///
/// Layout: `[magic: 4][version: u32][len: u32][crc32: u32][bincode payload]`,
/// integers little endian.
pub fn write_snapshot(path: &Path, snapshot: &SettingsSnapshot) -> Result<usize> {
    let data = bincode::serialize(snapshot)?;

    let mut hasher = Hasher::new();
    hasher.update(&data);
    let checksum = hasher.finalize();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&SNAPSHOT_MAGIC)?;
        writer.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
        writer.write_all(&(data.len() as u32).to_le_bytes())?;
        writer.write_all(&checksum.to_le_bytes())?;
        writer.write_all(&data)?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
    }
    fs::rename(&tmp_path, path)?;

    Ok(16 + data.len())
}

/// Read and validate a snapshot.
///
/// Returns `Ok(None)` when the file does not exist. Bad magic, a payload
/// length that disagrees with the file size or a checksum mismatch is
/// [`Error::Corrupt`]; a newer format
/// version is [`Error::InvalidArgument`] so callers can tell "damaged" apart
/// from "written by something else".
pub fn read_snapshot(path: &Path) -> Result<Option<SettingsSnapshot>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut header = [0u8; 16];
    reader
        .read_exact(&mut header)
        .map_err(|_| Error::Corrupt("truncated header".to_string()))?;

    if header[0..4] != SNAPSHOT_MAGIC {
        return Err(Error::Corrupt("bad magic".to_string()));
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != SNAPSHOT_VERSION {
        return Err(Error::InvalidArgument(format!(
            "unsupported settings file version {}",
            version
        )));
    }
    let len = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let expected_crc = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);

    if len as u64 != file_len.saturating_sub(16) {
        return Err(Error::Corrupt(format!(
            "payload length {} does not match file size {}",
            len, file_len
        )));
    }

    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .map_err(|_| Error::Corrupt("truncated payload".to_string()))?;

    let mut hasher = Hasher::new();
    hasher.update(&data);
    if hasher.finalize() != expected_crc {
        return Err(Error::Corrupt("checksum mismatch".to_string()));
    }

    let snapshot: SettingsSnapshot = bincode::deserialize(&data)?;
    Ok(Some(snapshot))
}
