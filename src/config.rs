use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::persistence::PersistenceConfig;
use crate::quota::{EntitlementPolicy, QuotaHook, StaticCredentials, StaticLicense};

/// adgate - ad-serving policy gates: API quota, consent cookie, bot filter
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Settings file
    #[arg(short, long, default_value = "./adgate-settings.bin")]
    pub data_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Paid add-on is installed and active
    #[arg(long)]
    pub paid_tier: bool,

    /// Paid add-on license is valid
    #[arg(long)]
    pub license_valid: bool,

    /// Site uses its own API credentials (no shared daily quota)
    #[arg(long)]
    pub own_credentials: bool,

    /// Override the paid daily quota
    #[arg(long)]
    pub paid_quota: Option<i64>,

    /// Use this Unix timestamp instead of the system clock
    #[arg(long)]
    pub now: Option<i64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Inspect or consume the daily API quota
    Quota {
        #[command(subcommand)]
        action: QuotaAction,
    },
    /// Decide whether a visitor still needs to consent
    Consent {
        /// Raw Cookie header, e.g. "a=1; b=2"
        #[arg(long)]
        header: Option<String>,

        /// Individual cookies as name=value (repeatable)
        #[arg(short, long = "cookie")]
        cookies: Vec<String>,

        /// Skip the check entirely
        #[arg(long)]
        force_skip: bool,
    },
    /// Classify a user agent
    Bot {
        /// User-Agent header value
        user_agent: String,

        /// Extra literal patterns (repeatable)
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },
    /// Read a setting
    Get {
        /// Settings group (general, privacy, adsense)
        group: String,
        key: String,
    },
    /// Write a setting (true/false/null/integers are typed, else string)
    Set {
        group: String,
        key: String,
        value: String,
    },
    /// List all stored settings
    List,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaAction {
    /// Show the current window
    Status,
    /// Count one call, failing if the quota is used up
    Consume,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse_args() -> Self {
        Config::parse()
    }

    pub fn persistence_config(&self) -> PersistenceConfig {
        PersistenceConfig::at(&self.data_file)
    }

    /// Entitlement policy from the license/credential flags.
    pub fn entitlement_policy(&self) -> EntitlementPolicy {
        let license = StaticLicense {
            paid_tier_loaded: self.paid_tier,
            license_valid: self.license_valid,
        };
        let policy = EntitlementPolicy::new(
            Arc::new(license),
            Arc::new(StaticCredentials(self.own_credentials)),
        );
        match self.paid_quota {
            Some(quota) => {
                let hook: Arc<dyn QuotaHook> = Arc::new(move |_: i64| quota);
                policy.with_hook(hook)
            }
            None => policy,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("./adgate-settings.bin"),
            log_level: "info".to_string(),
            paid_tier: false,
            license_valid: false,
            own_credentials: false,
            paid_quota: None,
            now: None,
            command: Command::Quota {
                action: QuotaAction::Status,
            },
        }
    }
}
