//! Key/value settings storage consumed by the policy gates.

mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::{
    default_for, SettingsStore, ADSENSE_API_QUOTA, CONSENT_COOKIE_COMPARISON,
    CONSENT_COOKIE_NAME, CONSENT_COOKIE_VALUE, CONSENT_REQUIRED,
};
