//! Persisted API quota record.
//!
//! One record per site tracks how many calls to the rate-limited ad network
//! API were made in the current rolling 24 hour window.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::SettingValue;

/// Rolling window length in seconds.
pub const WINDOW_SECS: i64 = 86_400;

/// Calls per window without a paid license.
pub const FREE_DAILY_QUOTA: i64 = 20;

/// Calls per window with a valid paid license, before hook overrides.
pub const PAID_DAILY_QUOTA: i64 = 20;

/// Ceiling used when the site brings its own API credentials.
pub const UNLIMITED: i64 = i64::MAX;

const FIELD_MAX: &str = "max";
const FIELD_CALLS: &str = "calls";
const FIELD_TIMESTAMP: &str = "timestamp";

/// Normalised quota record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRecord {
    /// Calls allowed in the current window
    pub max: i64,
    /// Calls made in the current window, never negative
    pub calls: i64,
    /// Unix seconds of the first call in the window; `None` until then
    pub timestamp: Option<i64>,
}

impl QuotaRecord {
    /// A fresh window with nothing consumed.
    pub fn fresh(max: i64) -> Self {
        Self {
            max,
            calls: 0,
            timestamp: None,
        }
    }

    /// Window has not started or is more than a day old.
    #[inline]
    pub fn is_stale(&self, now: i64) -> bool {
        match self.timestamp {
            None => true,
            Some(start) => now > start.saturating_add(WINDOW_SECS),
        }
    }

    /// Calls left in the window. Negative when over-consumed.
    #[inline]
    pub fn remaining(&self) -> i64 {
        self.max.saturating_sub(self.calls)
    }

    /// When the current window rolls over, if it has started.
    #[inline]
    pub fn resets_at(&self) -> Option<i64> {
        self.timestamp.map(|t| t.saturating_add(WINDOW_SECS))
    }

    /// Encode for the settings store.
    pub fn to_value(&self) -> SettingValue {
        let mut map = BTreeMap::new();
        map.insert(FIELD_MAX.to_string(), SettingValue::Int(self.max));
        map.insert(FIELD_CALLS.to_string(), SettingValue::Int(self.calls));
        map.insert(
            FIELD_TIMESTAMP.to_string(),
            self.timestamp.map_or(SettingValue::Null, SettingValue::Int),
        );
        SettingValue::Map(map)
    }
}

/// Record as found in the store, every field optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct StoredQuota {
    pub max: Option<i64>,
    pub calls: Option<i64>,
    pub timestamp: Option<i64>,
}

impl StoredQuota {
    /// Parse leniently. Anything that is not a map is treated as absent;
    /// fields that are not integers are treated as missing.
    pub fn from_value(value: &SettingValue) -> Option<Self> {
        let map = value.as_map()?;
        let field = |name: &str| map.get(name).and_then(SettingValue::as_int);
        Some(Self {
            max: field(FIELD_MAX),
            calls: field(FIELD_CALLS),
            timestamp: field(FIELD_TIMESTAMP),
        })
    }

    /// Normalise, or `None` when `max` is missing.
    pub fn normalize(&self) -> Option<QuotaRecord> {
        Some(QuotaRecord {
            max: self.max?,
            calls: self.calls.unwrap_or(0).max(0),
            timestamp: self.timestamp,
        })
    }
}

/// Current Unix timestamp in seconds.
#[inline]
pub fn current_timestamp_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_record_is_stale() {
        let record = QuotaRecord::fresh(20);
        assert!(record.is_stale(0));
        assert_eq!(record.remaining(), 20);
        assert_eq!(record.resets_at(), None);
    }

    #[test]
    fn test_window_boundary() {
        let record = QuotaRecord {
            max: 20,
            calls: 5,
            timestamp: Some(1_000),
        };
        assert!(!record.is_stale(1_000 + WINDOW_SECS));
        assert!(record.is_stale(1_000 + WINDOW_SECS + 1));
        assert_eq!(record.resets_at(), Some(1_000 + WINDOW_SECS));
    }

    #[test]
    fn test_unlimited_remaining_does_not_overflow() {
        let record = QuotaRecord {
            max: UNLIMITED,
            calls: 3,
            timestamp: Some(0),
        };
        assert_eq!(record.remaining(), UNLIMITED - 3);
    }

    #[test]
    fn test_value_roundtrip() {
        let record = QuotaRecord {
            max: 20,
            calls: 2,
            timestamp: Some(123),
        };
        let stored = StoredQuota::from_value(&record.to_value()).unwrap();
        assert_eq!(stored.normalize(), Some(record));

        let fresh = QuotaRecord::fresh(20);
        let stored = StoredQuota::from_value(&fresh.to_value()).unwrap();
        assert_eq!(stored.normalize(), Some(fresh));
    }

    #[test]
    fn test_lenient_parse() {
        assert_eq!(StoredQuota::from_value(&SettingValue::from("junk")), None);

        let mut map = BTreeMap::new();
        map.insert("max".to_string(), SettingValue::from("20"));
        map.insert("calls".to_string(), SettingValue::Int(-4));
        map.insert("timestamp".to_string(), SettingValue::from("soon"));
        let stored = StoredQuota::from_value(&SettingValue::Map(map)).unwrap();
        assert_eq!(
            stored.normalize(),
            Some(QuotaRecord {
                max: 20,
                calls: 0,
                timestamp: None,
            })
        );
    }

    #[test]
    fn test_missing_max_does_not_normalize() {
        let mut map = BTreeMap::new();
        map.insert("calls".to_string(), SettingValue::Int(4));
        let stored = StoredQuota::from_value(&SettingValue::Map(map)).unwrap();
        assert_eq!(stored.normalize(), None);
    }
}
