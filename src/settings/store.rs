use crate::types::{Group, SettingValue};

/// Settings key holding the persisted API quota record.
pub const ADSENSE_API_QUOTA: &str = "adsense_api_quota";
/// Whether visitors must consent before ads/tracking load.
pub const CONSENT_REQUIRED: &str = "consent_required";
/// Name of the cookie set by the site's consent banner.
pub const CONSENT_COOKIE_NAME: &str = "consent_cookie_name";
/// Value the consent cookie must have (empty means "cookie exists").
pub const CONSENT_COOKIE_VALUE: &str = "consent_cookie_value";
/// How the cookie value is compared (`equals`, `contains_insensitive`, ...).
pub const CONSENT_COOKIE_COMPARISON: &str = "consent_cookie_comparison";

/// Registered default for a key, applied by [`SettingsStore::get`] when
/// `use_default` is set and nothing is stored.
pub fn default_for(key: &str, group: Group) -> Option<SettingValue> {
    match (group, key) {
        (Group::Privacy, CONSENT_REQUIRED) => Some(SettingValue::Bool(false)),
        (Group::Privacy, CONSENT_COOKIE_COMPARISON) => Some(SettingValue::from("equals")),
        _ => None,
    }
}

/// Key/value settings storage the gates read from and write to.
///
/// Implementations must be cheap to call from request handling code and
/// safe to share between threads.
pub trait SettingsStore: Send + Sync {
    /// Raw stored value, `None` when nothing is stored.
    fn load(&self, key: &str, group: Group) -> Option<SettingValue>;

    /// Store a value. Returns `false` when the value was unchanged or could
    /// not be written.
    fn update(&self, key: &str, group: Group, value: SettingValue) -> bool;

    /// Stored value, else the registered default (when `use_default`), else
    /// `fallback`.
    fn get(
        &self,
        key: &str,
        group: Group,
        use_default: bool,
        fallback: Option<SettingValue>,
    ) -> Option<SettingValue> {
        self.load(key, group)
            .or_else(|| use_default.then(|| default_for(key, group)).flatten())
            .or(fallback)
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for std::sync::Arc<S> {
    fn load(&self, key: &str, group: Group) -> Option<SettingValue> {
        (**self).load(key, group)
    }

    fn update(&self, key: &str, group: Group, value: SettingValue) -> bool {
        (**self).update(key, group, value)
    }
}
