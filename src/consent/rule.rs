use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::consent::{sanitize_text_field, VisitorCookies};
use crate::error::Error;
use crate::settings::{
    SettingsStore, CONSENT_COOKIE_COMPARISON, CONSENT_COOKIE_NAME, CONSENT_COOKIE_VALUE,
    CONSENT_REQUIRED,
};
use crate::types::Group;

/// How the consent cookie is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Cookie must be present, any value
    Exists,
    /// Cookie value must equal the expected value
    Equals,
    /// Cookie value must contain the expected value
    Contains,
    /// Unrecognised comparison; no cookie value satisfies it
    Unsupported,
}

/// Comparison plus case handling, parsed from the stored comparison string
/// (`equals`, `contains`, `equals_insensitive`, `contains_insensitive`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonMode {
    pub compare: Comparison,
    pub case_insensitive: bool,
}

const INSENSITIVE_SUFFIX: &str = "_insensitive";

impl FromStr for ComparisonMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (base, case_insensitive) = match s.strip_suffix(INSENSITIVE_SUFFIX) {
            Some(base) => (base, true),
            None => (s.as_str(), false),
        };
        let compare = match base {
            "equals" => Comparison::Equals,
            "contains" => Comparison::Contains,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unknown cookie comparison: {}",
                    s
                )))
            }
        };
        Ok(Self {
            compare,
            case_insensitive,
        })
    }
}

impl Default for ComparisonMode {
    fn default() -> Self {
        Self {
            compare: Comparison::Equals,
            case_insensitive: false,
        }
    }
}

/// Consent policy derived from the privacy settings.
///
/// When `enabled` is false the other fields carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRule {
    pub enabled: bool,
    pub cookie_name: String,
    pub expected_value: String,
    pub compare: Comparison,
    pub case_insensitive: bool,
}

impl ConsentRule {
    /// Rule that never asks for consent.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            cookie_name: String::new(),
            expected_value: String::new(),
            compare: Comparison::Exists,
            case_insensitive: false,
        }
    }

    /// Enabled rule satisfied by the cookie merely existing.
    pub fn cookie_exists(cookie_name: impl Into<String>) -> Self {
        Self {
            enabled: true,
            cookie_name: cookie_name.into(),
            ..Self::disabled()
        }
    }

    /// Enabled rule comparing the cookie's value.
    pub fn cookie_value(
        cookie_name: impl Into<String>,
        expected_value: impl Into<String>,
        mode: ComparisonMode,
    ) -> Self {
        Self {
            enabled: true,
            cookie_name: cookie_name.into(),
            expected_value: expected_value.into(),
            compare: mode.compare,
            case_insensitive: mode.case_insensitive,
        }
    }

    /// Build the rule from settings. Any missing piece disables it.
    pub fn from_settings<S: SettingsStore + ?Sized>(store: &S) -> Self {
        let required = store
            .get(CONSENT_REQUIRED, Group::Privacy, true, None)
            .is_some_and(|v| v.is_truthy());
        if !required {
            return Self::disabled();
        }

        let text = |key: &str| -> String {
            store
                .get(key, Group::Privacy, true, None)
                .and_then(|v| v.as_text().map(|t| t.trim().to_string()))
                .unwrap_or_default()
        };

        let cookie_name = text(CONSENT_COOKIE_NAME);
        if cookie_name.is_empty() {
            debug!("Consent required but no cookie name configured, consent check disabled");
            return Self::disabled();
        }

        let expected_value = text(CONSENT_COOKIE_VALUE);
        if expected_value.is_empty() {
            return Self::cookie_exists(cookie_name);
        }

        let comparison = text(CONSENT_COOKIE_COMPARISON);
        let mode = if comparison.is_empty() {
            ComparisonMode::default()
        } else {
            comparison.parse().unwrap_or_else(|e| {
                warn!("{}, visitors will always be asked for consent", e);
                ComparisonMode {
                    compare: Comparison::Unsupported,
                    case_insensitive: false,
                }
            })
        };

        Self::cookie_value(cookie_name, expected_value, mode)
    }

    /// Whether a visitor with these cookies has yet to consent.
    pub fn is_unsatisfied_by<C: VisitorCookies + ?Sized>(&self, cookies: &C) -> bool {
        if !self.enabled {
            return false;
        }

        let Some(raw) = cookies.cookie(&self.cookie_name) else {
            return true;
        };
        if self.compare == Comparison::Exists {
            return false;
        }

        let mut actual = sanitize_text_field(raw);
        let mut expected = self.expected_value.clone();
        if self.case_insensitive {
            actual.make_ascii_lowercase();
            expected.make_ascii_lowercase();
        }

        match self.compare {
            Comparison::Equals => actual != expected,
            Comparison::Contains => !actual.contains(expected.as_str()),
            Comparison::Exists => false,
            Comparison::Unsupported => true,
        }
    }
}

impl fmt::Display for ConsentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            return f.write_str("disabled");
        }
        match self.compare {
            Comparison::Exists => write!(f, "cookie {:?} exists", self.cookie_name),
            Comparison::Unsupported => write!(
                f,
                "cookie {:?} unsupported comparison",
                self.cookie_name
            ),
            Comparison::Equals | Comparison::Contains => write!(
                f,
                "cookie {:?} {} {:?}{}",
                self.cookie_name,
                if self.compare == Comparison::Equals {
                    "equals"
                } else {
                    "contains"
                },
                self.expected_value,
                if self.case_insensitive {
                    " (case insensitive)"
                } else {
                    ""
                }
            ),
        }
    }
}
