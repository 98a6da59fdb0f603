pub mod bots;
pub mod config;
pub mod consent;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod quota;
pub mod settings;
pub mod types;

pub use bots::BotDetector;
pub use config::Config;
pub use consent::{ConsentGate, ConsentRule, CookieJar, VisitorCookies};
pub use error::{Error, Result};
pub use metrics::GateMetrics;
pub use persistence::FileStore;
pub use quota::{EntitlementPolicy, QuotaCounter, QuotaRecord};
pub use settings::{MemoryStore, SettingsStore};
pub use types::{Group, SettingKey, SettingValue};
