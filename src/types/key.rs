use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::Error;

/// Settings group a key lives in.
///
/// The host CMS keeps one option blob per group; the stores here keep the
/// group as part of the key so the same name can exist in two groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Group {
    General,
    Privacy,
    Adsense,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::General, Group::Privacy, Group::Adsense];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::General => "general",
            Group::Privacy => "privacy",
            Group::Adsense => "adsense",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Group {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Group::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown settings group: {}", s)))
    }
}

/// Fully qualified settings key: group plus name.
///
/// Names are usually string literals; `from_static` builds those without
/// allocating.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SettingKey {
    group: Group,
    name: Cow<'static, str>,
}

impl SettingKey {
    /// Create a key from a static name (no allocation)
    #[inline]
    pub const fn from_static(group: Group, name: &'static str) -> Self {
        Self {
            group,
            name: Cow::Borrowed(name),
        }
    }

    /// Create a key from an owned or borrowed name
    #[inline]
    pub fn new(group: Group, name: impl Into<String>) -> Self {
        Self {
            group,
            name: Cow::Owned(name.into()),
        }
    }

    #[inline]
    pub fn group(&self) -> Group {
        self.group
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Hash for SettingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.name.as_ref().hash(state);
    }
}

impl fmt::Debug for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SettingKey({}/{})", self.group, self.name)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}
