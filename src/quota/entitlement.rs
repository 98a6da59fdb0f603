use std::fmt;
use std::sync::Arc;

use crate::quota::{FREE_DAILY_QUOTA, PAID_DAILY_QUOTA, UNLIMITED};

/// Paid add-on state, provided by the host.
pub trait LicenseStatus: Send + Sync {
    /// Paid tier is installed and active.
    fn is_paid_tier_loaded(&self) -> bool;
    /// Paid tier license is currently valid.
    fn license_valid(&self) -> bool;
}

/// Whether the site uses its own API credentials (no shared quota).
pub trait CredentialSource: Send + Sync {
    fn has_self_managed_credentials(&self) -> bool;
}

/// Extension point to override the paid daily quota.
pub trait QuotaHook: Send + Sync {
    fn paid_daily_quota(&self, default: i64) -> i64;
}

impl<F> QuotaHook for F
where
    F: Fn(i64) -> i64 + Send + Sync,
{
    fn paid_daily_quota(&self, default: i64) -> i64 {
        self(default)
    }
}

/// Fixed license state, for hosts that resolve it up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticLicense {
    pub paid_tier_loaded: bool,
    pub license_valid: bool,
}

impl StaticLicense {
    pub const NONE: StaticLicense = StaticLicense {
        paid_tier_loaded: false,
        license_valid: false,
    };

    pub const PAID: StaticLicense = StaticLicense {
        paid_tier_loaded: true,
        license_valid: true,
    };
}

impl LicenseStatus for StaticLicense {
    fn is_paid_tier_loaded(&self) -> bool {
        self.paid_tier_loaded
    }

    fn license_valid(&self) -> bool {
        self.license_valid
    }
}

/// Fixed credential state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticCredentials(pub bool);

impl CredentialSource for StaticCredentials {
    fn has_self_managed_credentials(&self) -> bool {
        self.0
    }
}

/// Which ceiling applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Free,
    Paid,
    Unlimited,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Free => f.write_str("free"),
            Tier::Paid => f.write_str("paid"),
            Tier::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Computes the calls-per-day ceiling from credential and license state.
///
/// Evaluated on every quota access: the license can lapse or credentials
/// change mid-window.
#[derive(Clone)]
pub struct EntitlementPolicy {
    license: Arc<dyn LicenseStatus>,
    credentials: Arc<dyn CredentialSource>,
    hook: Option<Arc<dyn QuotaHook>>,
}

impl EntitlementPolicy {
    pub fn new(license: Arc<dyn LicenseStatus>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            license,
            credentials,
            hook: None,
        }
    }

    /// No paid tier, shared credentials.
    pub fn free() -> Self {
        Self::new(Arc::new(StaticLicense::NONE), Arc::new(StaticCredentials(false)))
    }

    /// Install a hook overriding the paid quota.
    pub fn with_hook(mut self, hook: Arc<dyn QuotaHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn tier(&self) -> Tier {
        if self.credentials.has_self_managed_credentials() {
            Tier::Unlimited
        } else if self.license.is_paid_tier_loaded() && self.license.license_valid() {
            Tier::Paid
        } else {
            Tier::Free
        }
    }

    /// Current ceiling. A hook can raise the paid quota but never push it
    /// below the free default or up to the unlimited sentinel.
    pub fn entitlement(&self) -> i64 {
        match self.tier() {
            Tier::Unlimited => UNLIMITED,
            Tier::Paid => {
                let quota = match &self.hook {
                    Some(hook) => hook.paid_daily_quota(PAID_DAILY_QUOTA),
                    None => PAID_DAILY_QUOTA,
                };
                quota.clamp(FREE_DAILY_QUOTA, UNLIMITED - 1)
            }
            Tier::Free => FREE_DAILY_QUOTA,
        }
    }
}

impl fmt::Debug for EntitlementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitlementPolicy")
            .field("tier", &self.tier())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(license: StaticLicense, own_credentials: bool) -> EntitlementPolicy {
        EntitlementPolicy::new(Arc::new(license), Arc::new(StaticCredentials(own_credentials)))
    }

    #[test]
    fn test_free_default() {
        assert_eq!(EntitlementPolicy::free().tier(), Tier::Free);
        assert_eq!(EntitlementPolicy::free().entitlement(), FREE_DAILY_QUOTA);
    }

    #[test]
    fn test_paid_requires_valid_license() {
        let lapsed = StaticLicense {
            paid_tier_loaded: true,
            license_valid: false,
        };
        assert_eq!(policy(lapsed, false).tier(), Tier::Free);

        let not_loaded = StaticLicense {
            paid_tier_loaded: false,
            license_valid: true,
        };
        assert_eq!(policy(not_loaded, false).tier(), Tier::Free);

        assert_eq!(policy(StaticLicense::PAID, false).tier(), Tier::Paid);
        assert_eq!(policy(StaticLicense::PAID, false).entitlement(), PAID_DAILY_QUOTA);
    }

    #[test]
    fn test_own_credentials_are_unlimited() {
        assert_eq!(policy(StaticLicense::NONE, true).entitlement(), UNLIMITED);
        assert_eq!(policy(StaticLicense::PAID, true).entitlement(), UNLIMITED);
    }

    #[test]
    fn test_hook_overrides_paid_quota_only() {
        let hook: Arc<dyn QuotaHook> = Arc::new(|default: i64| default * 5);
        assert_eq!(
            policy(StaticLicense::PAID, false)
                .with_hook(hook.clone())
                .entitlement(),
            100
        );
        assert_eq!(
            policy(StaticLicense::NONE, false)
                .with_hook(hook)
                .entitlement(),
            FREE_DAILY_QUOTA
        );
    }

    #[test]
    fn test_ordering_holds_with_hostile_hook() {
        let hook: Arc<dyn QuotaHook> = Arc::new(|_: i64| -5);
        let paid = policy(StaticLicense::PAID, false).with_hook(hook);
        let free = EntitlementPolicy::free();
        let unlimited = policy(StaticLicense::NONE, true);

        assert!(paid.entitlement() >= free.entitlement());
        assert!(unlimited.entitlement() >= paid.entitlement());
    }
}
