use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// A stored setting value.
///
/// Mirrors the loosely typed values the host CMS keeps in its options table,
/// so every accessor is lenient: callers ask for the shape they want and get
/// `None` when the stored value cannot be read that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<SettingValue>),
    Map(BTreeMap<String, SettingValue>),
}

impl SettingValue {
    /// Host-CMS truthiness: null, false, 0, "", "0" and empty collections
    /// are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            SettingValue::Null => false,
            SettingValue::Bool(b) => *b,
            SettingValue::Int(i) => *i != 0,
            SettingValue::Str(s) => !(s.is_empty() || s == "0"),
            SettingValue::List(l) => !l.is_empty(),
            SettingValue::Map(m) => !m.is_empty(),
        }
    }

    /// Read as text. Integers and booleans are rendered, collections are not.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            SettingValue::Str(s) => Some(Cow::Borrowed(s)),
            SettingValue::Int(i) => Some(Cow::Owned(i.to_string())),
            SettingValue::Bool(true) => Some(Cow::Borrowed("1")),
            SettingValue::Bool(false) => Some(Cow::Borrowed("")),
            _ => None,
        }
    }

    /// Read as an integer. Numeric strings are parsed after trimming.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            SettingValue::Str(s) => s.trim().parse().ok(),
            SettingValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, SettingValue>> {
        match self {
            SettingValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Parse a value typed on a command line: `true`/`false`, integers,
    /// `null`, anything else is a string.
    pub fn parse_loose(s: &str) -> Self {
        match s {
            "true" => SettingValue::Bool(true),
            "false" => SettingValue::Bool(false),
            "null" => SettingValue::Null,
            _ => match s.parse::<i64>() {
                Ok(i) => SettingValue::Int(i),
                Err(_) => SettingValue::Str(s.to_string()),
            },
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Null => f.write_str("null"),
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(i) => write!(f, "{}", i),
            SettingValue::Str(s) => write!(f, "{:?}", s),
            SettingValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            SettingValue::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

impl From<i64> for SettingValue {
    fn from(i: i64) -> Self {
        SettingValue::Int(i)
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::Str(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        SettingValue::Str(s)
    }
}

impl From<BTreeMap<String, SettingValue>> for SettingValue {
    fn from(m: BTreeMap<String, SettingValue>) -> Self {
        SettingValue::Map(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!SettingValue::Null.is_truthy());
        assert!(!SettingValue::Bool(false).is_truthy());
        assert!(!SettingValue::Int(0).is_truthy());
        assert!(!SettingValue::from("").is_truthy());
        assert!(!SettingValue::from("0").is_truthy());
        assert!(!SettingValue::List(vec![]).is_truthy());

        assert!(SettingValue::Bool(true).is_truthy());
        assert!(SettingValue::Int(-1).is_truthy());
        assert!(SettingValue::from("1").is_truthy());
        assert!(SettingValue::from("false").is_truthy());
    }

    #[test]
    fn test_as_int_is_lenient() {
        assert_eq!(SettingValue::Int(7).as_int(), Some(7));
        assert_eq!(SettingValue::from(" 42 ").as_int(), Some(42));
        assert_eq!(SettingValue::from("abc").as_int(), None);
        assert_eq!(SettingValue::Null.as_int(), None);
    }

    #[test]
    fn test_as_text() {
        assert_eq!(SettingValue::from("yes").as_text().as_deref(), Some("yes"));
        assert_eq!(SettingValue::Int(3).as_text().as_deref(), Some("3"));
        assert_eq!(SettingValue::Map(BTreeMap::new()).as_text(), None);
    }

    #[test]
    fn test_parse_loose() {
        assert_eq!(SettingValue::parse_loose("true"), SettingValue::Bool(true));
        assert_eq!(SettingValue::parse_loose("12"), SettingValue::Int(12));
        assert_eq!(SettingValue::parse_loose("null"), SettingValue::Null);
        assert_eq!(
            SettingValue::parse_loose("contains_insensitive"),
            SettingValue::from("contains_insensitive")
        );
    }
}
