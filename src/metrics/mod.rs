//! Observability counters for the policy gates.
//!
//! Lock-free counters describing quota consumption and consent/bot
//! decisions. An instance is created by whoever builds the gates and shared
//! through `Arc`; there is no global registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Relaxed ordering for counters (eventual visibility is fine for metrics).
const RELAXED: Ordering = Ordering::Relaxed;

/// Collection of gate metrics.
#[derive(Debug)]
pub struct GateMetrics {
    // Quota counters
    pub quota_consumed: AtomicU64,
    pub quota_exhausted: AtomicU64,
    pub quota_resets: AtomicU64,
    pub quota_raised: AtomicU64,
    pub quota_clamped: AtomicU64,

    // Consent counters
    pub consent_checks: AtomicU64,
    pub consent_needed: AtomicU64,
    pub consent_skipped: AtomicU64,

    // Bot detection
    pub bot_checks: AtomicU64,
    pub bots_detected: AtomicU64,

    start_time: AtomicU64,
}

impl GateMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub const fn new() -> Self {
        Self {
            quota_consumed: AtomicU64::new(0),
            quota_exhausted: AtomicU64::new(0),
            quota_resets: AtomicU64::new(0),
            quota_raised: AtomicU64::new(0),
            quota_clamped: AtomicU64::new(0),

            consent_checks: AtomicU64::new(0),
            consent_needed: AtomicU64::new(0),
            consent_skipped: AtomicU64::new(0),

            bot_checks: AtomicU64::new(0),
            bots_detected: AtomicU64::new(0),

            start_time: AtomicU64::new(0),
        }
    }

    /// Record the start time. Call once when the owning context is built.
    pub fn init_start_time(&self) {
        self.start_time.store(now_secs(), RELAXED);
    }

    /// Seconds since `init_start_time`, 0 if it was never called.
    pub fn uptime_secs(&self) -> u64 {
        let start = self.start_time.load(RELAXED);
        if start == 0 {
            return 0;
        }
        now_secs().saturating_sub(start)
    }

    /// Increment a counter.
    #[inline]
    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, RELAXED);
    }

    /// Get counter value.
    #[inline]
    pub fn get(&self, counter: &AtomicU64) -> u64 {
        counter.load(RELAXED)
    }

    /// Record one consent decision.
    #[inline]
    pub fn record_consent(&self, needed: bool) {
        self.consent_checks.fetch_add(1, RELAXED);
        if needed {
            self.consent_needed.fetch_add(1, RELAXED);
        }
    }

    /// Record one user-agent classification.
    #[inline]
    pub fn record_bot_check(&self, is_bot: bool) {
        self.bot_checks.fetch_add(1, RELAXED);
        if is_bot {
            self.bots_detected.fetch_add(1, RELAXED);
        }
    }

    /// Get a snapshot of all metrics for reporting.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),

            quota_consumed: self.quota_consumed.load(RELAXED),
            quota_exhausted: self.quota_exhausted.load(RELAXED),
            quota_resets: self.quota_resets.load(RELAXED),
            quota_raised: self.quota_raised.load(RELAXED),
            quota_clamped: self.quota_clamped.load(RELAXED),

            consent_checks: self.consent_checks.load(RELAXED),
            consent_needed: self.consent_needed.load(RELAXED),
            consent_skipped: self.consent_skipped.load(RELAXED),

            bot_checks: self.bot_checks.load(RELAXED),
            bots_detected: self.bots_detected.load(RELAXED),
        }
    }
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,

    pub quota_consumed: u64,
    pub quota_exhausted: u64,
    pub quota_resets: u64,
    pub quota_raised: u64,
    pub quota_clamped: u64,

    pub consent_checks: u64,
    pub consent_needed: u64,
    pub consent_skipped: u64,

    pub bot_checks: u64,
    pub bots_detected: u64,
}

impl MetricsSnapshot {
    /// Format as INFO-style `name:value` lines grouped into sections.
    /// `section` limits output to one of `server`, `quota`, `consent`, `bots`.
    pub fn to_info_string(&self, section: Option<&str>) -> String {
        let mut out = String::with_capacity(512);

        let include_all = section.is_none();
        let section = section.unwrap_or("");
        let wants = |name: &str| include_all || section.eq_ignore_ascii_case(name);

        if wants("server") {
            out.push_str("# Server\r\n");
            out.push_str(&format!("ad_gate_version:{}\r\n", env!("CARGO_PKG_VERSION")));
            out.push_str(&format!("uptime_in_seconds:{}\r\n", self.uptime_secs));
            out.push_str("\r\n");
        }

        if wants("quota") {
            out.push_str("# Quota\r\n");
            out.push_str(&format!("quota_consumed:{}\r\n", self.quota_consumed));
            out.push_str(&format!("quota_exhausted:{}\r\n", self.quota_exhausted));
            out.push_str(&format!("quota_window_resets:{}\r\n", self.quota_resets));
            out.push_str(&format!("quota_max_raised:{}\r\n", self.quota_raised));
            out.push_str(&format!("quota_max_clamped:{}\r\n", self.quota_clamped));
            out.push_str("\r\n");
        }

        if wants("consent") {
            out.push_str("# Consent\r\n");
            out.push_str(&format!("consent_checks:{}\r\n", self.consent_checks));
            out.push_str(&format!("consent_needed:{}\r\n", self.consent_needed));
            out.push_str(&format!("consent_force_skipped:{}\r\n", self.consent_skipped));
            out.push_str("\r\n");
        }

        if wants("bots") {
            out.push_str("# Bots\r\n");
            out.push_str(&format!("bot_checks:{}\r\n", self.bot_checks));
            out.push_str(&format!("bots_detected:{}\r\n", self.bots_detected));
            out.push_str("\r\n");
        }

        out
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
