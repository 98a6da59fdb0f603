use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metrics::GateMetrics;
use crate::quota::record::StoredQuota;
use crate::quota::{EntitlementPolicy, QuotaRecord};
use crate::settings::{SettingsStore, ADSENSE_API_QUOTA};
use crate::types::Group;

/// Where the quota record lives in the settings store.
pub const QUOTA_GROUP: Group = Group::Adsense;

/// Point-in-time view of the quota for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub max: i64,
    pub calls: i64,
    pub remaining: i64,
    /// Start of the current window, `None` before the first call
    pub window_start: Option<i64>,
    /// When the window rolls over, `None` before the first call
    pub resets_at: Option<i64>,
}

/// Daily rolling counter for calls to the rate-limited API.
///
/// The ceiling comes from [`EntitlementPolicy`] on every access, while the
/// consumed count persists across entitlement changes within a window.
/// Calls on one instance are serialised; separate processes sharing a store
/// are last-writer-wins.
pub struct QuotaCounter<S: SettingsStore + ?Sized> {
    store: Arc<S>,
    policy: EntitlementPolicy,
    metrics: Arc<GateMetrics>,
    lock: Mutex<()>,
}

impl<S: SettingsStore + ?Sized> QuotaCounter<S> {
    pub fn new(store: Arc<S>, policy: EntitlementPolicy) -> Self {
        Self {
            store,
            policy,
            metrics: Arc::new(GateMetrics::new()),
            lock: Mutex::new(()),
        }
    }

    /// Share a metrics instance with other gates.
    pub fn with_metrics(mut self, metrics: Arc<GateMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn policy(&self) -> &EntitlementPolicy {
        &self.policy
    }

    /// Calls-per-day ceiling right now.
    #[inline]
    pub fn entitlement(&self) -> i64 {
        self.policy.entitlement()
    }

    /// Calls left in the current window.
    ///
    /// Starts a new window (and persists it) when the stored one is missing
    /// or stale; raises the stored ceiling when the entitlement grew.
    pub fn remaining(&self, now: i64) -> i64 {
        let _guard = self.lock.lock();
        self.refresh(now).remaining()
    }

    /// Whether at least one call is left.
    pub fn has_remaining(&self, now: i64) -> bool {
        self.remaining(now) > 0
    }

    /// Count one API call and return the updated record.
    ///
    /// Does not check the ceiling; see [`try_consume`](Self::try_consume).
    pub fn consume(&self, now: i64) -> QuotaRecord {
        let _guard = self.lock.lock();
        self.consume_locked(now)
    }

    /// Count one API call only if the window has room for it.
    pub fn try_consume(&self, now: i64) -> Result<QuotaRecord> {
        let _guard = self.lock.lock();
        let record = self.refresh(now);
        if record.remaining() <= 0 {
            self.metrics.inc(&self.metrics.quota_exhausted);
            return Err(Error::QuotaExhausted {
                max: record.max,
                calls: record.calls,
            });
        }
        Ok(self.consume_locked(now))
    }

    /// Current state for display.
    pub fn status(&self, now: i64) -> QuotaStatus {
        let _guard = self.lock.lock();
        let record = self.refresh(now);
        QuotaStatus {
            max: record.max,
            calls: record.calls,
            remaining: record.remaining(),
            window_start: record.timestamp,
            resets_at: record.resets_at(),
        }
    }

    fn consume_locked(&self, now: i64) -> QuotaRecord {
        let entitlement = self.entitlement();
        let (mut record, _) = self.load_window(now, entitlement);

        if record.max > entitlement {
            debug!(
                "Clamping API quota from {} to {} calls",
                record.max, entitlement
            );
            record.max = entitlement;
            self.metrics.inc(&self.metrics.quota_clamped);
        }
        if record.timestamp.is_none() {
            record.timestamp = Some(now);
        }
        record.calls = record.calls.saturating_add(1);

        self.save(&record);
        self.metrics.inc(&self.metrics.quota_consumed);
        record
    }

    /// Load the window for reading: reset when stale, raise when the
    /// entitlement grew. Persists either change.
    fn refresh(&self, now: i64) -> QuotaRecord {
        let entitlement = self.entitlement();
        let (mut record, reset) = self.load_window(now, entitlement);

        if reset {
            self.save(&record);
        } else if record.max < entitlement {
            debug!(
                "Raising API quota from {} to {} calls",
                record.max, entitlement
            );
            record.max = entitlement;
            self.metrics.inc(&self.metrics.quota_raised);
            self.save(&record);
        }
        record
    }

    /// Stored record, or a fresh window at `entitlement` when the stored one
    /// is missing, unreadable or stale. The flag is true for a fresh window.
    fn load_window(&self, now: i64, entitlement: i64) -> (QuotaRecord, bool) {
        let stored = self.store.load(ADSENSE_API_QUOTA, QUOTA_GROUP);
        let record = match stored.as_ref() {
            None => None,
            Some(value) => {
                let parsed = StoredQuota::from_value(value).and_then(|s| s.normalize());
                if parsed.is_none() {
                    warn!("Stored API quota record is unreadable, starting a new window");
                }
                parsed
            }
        };

        match record {
            Some(record) if !record.is_stale(now) => (record, false),
            Some(record) => {
                if record.timestamp.is_some() {
                    debug!("API quota window expired, resetting");
                    self.metrics.inc(&self.metrics.quota_resets);
                }
                (QuotaRecord::fresh(entitlement), true)
            }
            None => (QuotaRecord::fresh(entitlement), true),
        }
    }

    fn save(&self, record: &QuotaRecord) {
        let value = record.to_value();
        let unchanged = self
            .store
            .load(ADSENSE_API_QUOTA, QUOTA_GROUP)
            .is_some_and(|stored| stored == value);
        if !unchanged && !self.store.update(ADSENSE_API_QUOTA, QUOTA_GROUP, value) {
            warn!("Failed to persist API quota record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::{
        QuotaHook, StaticCredentials, StaticLicense, FREE_DAILY_QUOTA, UNLIMITED, WINDOW_SECS,
    };
    use crate::settings::MemoryStore;
    use crate::types::SettingValue;
    use std::sync::atomic::{AtomicBool, Ordering};

    const T0: i64 = 1_700_000_000;

    fn free_counter() -> (Arc<MemoryStore>, QuotaCounter<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let counter = QuotaCounter::new(store.clone(), EntitlementPolicy::free());
        (store, counter)
    }

    fn stored_record(store: &MemoryStore) -> QuotaRecord {
        let value = store.load(ADSENSE_API_QUOTA, QUOTA_GROUP).unwrap();
        StoredQuota::from_value(&value).unwrap().normalize().unwrap()
    }

    /// License whose validity can be flipped mid-test.
    struct ToggleLicense(AtomicBool);

    impl crate::quota::LicenseStatus for ToggleLicense {
        fn is_paid_tier_loaded(&self) -> bool {
            true
        }
        fn license_valid(&self) -> bool {
            self.0.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn test_absent_quota_scenario() {
        let (store, counter) = free_counter();

        assert_eq!(counter.remaining(T0), 20);
        assert_eq!(stored_record(&store), QuotaRecord::fresh(20));

        let record = counter.consume(T0);
        assert_eq!(record.calls, 1);
        assert_eq!(record.timestamp, Some(T0));
        assert_eq!(stored_record(&store), record);

        assert_eq!(counter.remaining(T0 + 10), 19);
        assert!(counter.has_remaining(T0 + 10));
    }

    #[test]
    fn test_consume_keeps_window_start() {
        let (_, counter) = free_counter();
        for i in 0..5 {
            counter.consume(T0 + i * 1_000);
        }
        let record = counter.consume(T0 + WINDOW_SECS);
        assert_eq!(record.calls, 6);
        assert_eq!(record.timestamp, Some(T0));
        assert_eq!(counter.remaining(T0 + WINDOW_SECS), FREE_DAILY_QUOTA - 6);
    }

    #[test]
    fn test_stale_window_resets_on_remaining() {
        let (store, counter) = free_counter();
        counter.consume(T0);
        counter.consume(T0 + 1);

        let later = T0 + WINDOW_SECS + 1;
        assert_eq!(counter.remaining(later), 20);
        assert_eq!(stored_record(&store), QuotaRecord::fresh(20));
    }

    #[test]
    fn test_stale_window_resets_on_consume() {
        let (_, counter) = free_counter();
        counter.consume(T0);
        counter.consume(T0 + 1);

        let later = T0 + WINDOW_SECS + 1;
        let record = counter.consume(later);
        assert_eq!(record.calls, 1);
        assert_eq!(record.timestamp, Some(later));
    }

    #[test]
    fn test_has_remaining_false_when_used_up() {
        let (_, counter) = free_counter();
        for _ in 0..FREE_DAILY_QUOTA {
            counter.consume(T0);
        }
        assert_eq!(counter.remaining(T0 + 1), 0);
        assert!(!counter.has_remaining(T0 + 1));

        // consume itself never refuses
        let record = counter.consume(T0 + 2);
        assert_eq!(record.calls, FREE_DAILY_QUOTA + 1);
        assert_eq!(counter.remaining(T0 + 3), -1);
    }

    #[test]
    fn test_try_consume_refuses_when_exhausted() {
        let (_, counter) = free_counter();
        for _ in 0..FREE_DAILY_QUOTA {
            counter.try_consume(T0).unwrap();
        }
        let err = counter.try_consume(T0).unwrap_err();
        assert!(matches!(
            err,
            Error::QuotaExhausted {
                max: 20,
                calls: 20
            }
        ));
        assert_eq!(counter.metrics.snapshot().quota_exhausted, 1);
    }

    #[test]
    fn test_license_lapse_clamps_but_keeps_calls() {
        let store = Arc::new(MemoryStore::new());
        let license = Arc::new(ToggleLicense(AtomicBool::new(true)));
        let hook: Arc<dyn QuotaHook> = Arc::new(|_: i64| 100);
        let policy = EntitlementPolicy::new(license.clone(), Arc::new(StaticCredentials(false)))
            .with_hook(hook);
        let counter = QuotaCounter::new(store.clone(), policy);

        assert_eq!(counter.remaining(T0), 100);
        for _ in 0..30 {
            counter.consume(T0);
        }
        assert_eq!(counter.remaining(T0 + 1), 70);

        license.0.store(false, Ordering::Relaxed);
        let record = counter.consume(T0 + 2);
        assert_eq!(record.max, FREE_DAILY_QUOTA);
        assert_eq!(record.calls, 31);
        assert_eq!(record.timestamp, Some(T0));
        assert!(!counter.has_remaining(T0 + 3));
    }

    #[test]
    fn test_upgrade_raises_max_mid_window() {
        let store = Arc::new(MemoryStore::new());
        let license = Arc::new(ToggleLicense(AtomicBool::new(false)));
        let hook: Arc<dyn QuotaHook> = Arc::new(|_: i64| 50);
        let policy = EntitlementPolicy::new(license.clone(), Arc::new(StaticCredentials(false)))
            .with_hook(hook);
        let counter = QuotaCounter::new(store.clone(), policy);

        for _ in 0..5 {
            counter.consume(T0);
        }
        assert_eq!(counter.remaining(T0), 15);

        license.0.store(true, Ordering::Relaxed);
        assert_eq!(counter.remaining(T0 + 1), 45);
        let stored = stored_record(&store);
        assert_eq!(stored.max, 50);
        assert_eq!(stored.calls, 5);
        assert_eq!(stored.timestamp, Some(T0));
    }

    #[test]
    fn test_unlimited_with_own_credentials() {
        let store = Arc::new(MemoryStore::new());
        let policy = EntitlementPolicy::new(
            Arc::new(StaticLicense::NONE),
            Arc::new(StaticCredentials(true)),
        );
        let counter = QuotaCounter::new(store, policy);

        for _ in 0..1_000 {
            counter.consume(T0);
        }
        assert_eq!(counter.remaining(T0), UNLIMITED - 1_000);
        assert!(counter.try_consume(T0).is_ok());
    }

    #[test]
    fn test_corrupt_record_starts_fresh() {
        let (store, counter) = free_counter();
        store.update(ADSENSE_API_QUOTA, QUOTA_GROUP, SettingValue::from("garbage"));

        assert_eq!(counter.remaining(T0), 20);
        let record = counter.consume(T0);
        assert_eq!(record.calls, 1);
        assert_eq!(record.timestamp, Some(T0));
    }

    #[test]
    fn test_negative_calls_read_as_zero() {
        let (store, counter) = free_counter();
        let record = QuotaRecord {
            max: 20,
            calls: -7,
            timestamp: Some(T0),
        };
        store.update(ADSENSE_API_QUOTA, QUOTA_GROUP, record.to_value());

        assert_eq!(counter.remaining(T0 + 5), 20);
        assert_eq!(counter.consume(T0 + 5).calls, 1);
    }

    #[test]
    fn test_saturated_calls_do_not_overflow() {
        let (store, counter) = free_counter();
        let record = QuotaRecord {
            max: 20,
            calls: i64::MAX,
            timestamp: Some(T0),
        };
        store.update(ADSENSE_API_QUOTA, QUOTA_GROUP, record.to_value());

        let record = counter.consume(T0 + 10);
        assert_eq!(record.calls, i64::MAX);
        assert_eq!(record.timestamp, Some(T0));
        assert!(!counter.has_remaining(T0 + 20));
        assert!(counter.try_consume(T0 + 30).is_err());
    }

    #[test]
    fn test_status_reports_window() {
        let (_, counter) = free_counter();
        let status = counter.status(T0);
        assert_eq!(status.remaining, 20);
        assert_eq!(status.window_start, None);

        counter.consume(T0);
        let status = counter.status(T0 + 60);
        assert_eq!(status.calls, 1);
        assert_eq!(status.remaining, 19);
        assert_eq!(status.window_start, Some(T0));
        assert_eq!(status.resets_at, Some(T0 + WINDOW_SECS));
    }

    #[test]
    fn test_metrics_track_resets_and_consumption() {
        let (_, counter) = free_counter();
        let metrics = Arc::new(GateMetrics::new());
        let counter = counter.with_metrics(metrics.clone());

        counter.consume(T0);
        counter.consume(T0 + WINDOW_SECS + 1);

        let snap = metrics.snapshot();
        assert_eq!(snap.quota_consumed, 2);
        assert_eq!(snap.quota_resets, 1);
    }

    #[test]
    fn test_concurrent_consumers_on_one_counter() {
        let (_, counter) = free_counter();
        let counter = Arc::new(counter);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        counter.consume(T0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.status(T0).calls, 100);
    }
}
