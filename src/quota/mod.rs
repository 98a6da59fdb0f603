//! Daily API quota accounting.

mod counter;
mod entitlement;
mod record;

pub use counter::{QuotaCounter, QuotaStatus, QUOTA_GROUP};
pub use entitlement::{
    CredentialSource, EntitlementPolicy, LicenseStatus, QuotaHook, StaticCredentials,
    StaticLicense, Tier,
};
pub use record::{
    current_timestamp_secs, QuotaRecord, FREE_DAILY_QUOTA, PAID_DAILY_QUOTA, UNLIMITED,
    WINDOW_SECS,
};
