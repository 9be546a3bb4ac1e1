//! Field tags: declared constraints and options on a mapped field.
//!
//! A tag is declared as a comma separated list of `key` or `key=value`
//! entries, e.g. `primary_key,max_length=64`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Tag keys understood by the built-in backends.
pub mod keys {
    pub const PRIMARY_KEY: &str = "primary_key";
    pub const AUTO_INCREMENT: &str = "auto_increment";
    pub const NOT_NULL: &str = "not_null";
    pub const UNIQUE: &str = "unique";
    pub const MAX_LENGTH: &str = "max_length";
    pub const DEFAULT: &str = "default";
    pub const COLUMN: &str = "column";
}

/// Malformed tag declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagParseError {
    #[error("empty key in tag '{0}'")]
    EmptyKey(String),

    #[error("invalid key '{0}': keys are lowercase letters, digits and '_'")]
    InvalidKey(String),

    #[error("duplicate key '{0}'")]
    DuplicateKey(String),
}

/// A recognized key carries a value it cannot accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTagValue {
    pub key: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl fmt::Display for InvalidTagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value '{}' is not valid, expected {}",
            self.value, self.expected
        )
    }
}

/// How a primary key gets its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKey {
    /// Generated by the engine on insert (auto-increment surrogate key).
    Auto,
    /// Supplied by the caller.
    Natural,
}

/// Immutable option map parsed from a tag declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    options: BTreeMap<String, Option<String>>,
}

impl Tag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a declaration such as `primary_key,max_length=64`.
    ///
    /// Whitespace around entries is ignored and empty entries are skipped.
    pub fn parse(declaration: &str) -> Result<Self, TagParseError> {
        let mut options = BTreeMap::new();
        for entry in declaration.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (key, value) = match entry.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value.trim().to_string())),
                None => (entry, None),
            };
            if key.is_empty() {
                return Err(TagParseError::EmptyKey(declaration.to_string()));
            }
            if !key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(TagParseError::InvalidKey(key.to_string()));
            }
            if options.insert(key.to_string(), value).is_some() {
                return Err(TagParseError::DuplicateKey(key.to_string()));
            }
        }
        Ok(Self { options })
    }

    /// Builder-style insert, replacing an existing entry.
    pub fn with(mut self, key: &str, value: Option<&str>) -> Self {
        self.options
            .insert(key.to_string(), value.map(|v| v.to_string()));
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Value of `key`, if the key is present and carries one.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.options
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Boolean flag: present without a value, or with `true`/`false`.
    pub fn flag(&self, key: &'static str) -> Result<bool, InvalidTagValue> {
        match self.options.get(key) {
            None => Ok(false),
            Some(None) => Ok(true),
            Some(Some(v)) => parse_bool(key, v),
        }
    }

    /// Primary key declaration: bare, `true` or `auto` mean an engine
    /// generated key, `natural` a caller supplied one, `false` none.
    pub fn primary_key(&self) -> Result<Option<PrimaryKey>, InvalidTagValue> {
        match self.options.get(keys::PRIMARY_KEY) {
            None => Ok(None),
            Some(None) => Ok(Some(PrimaryKey::Auto)),
            Some(Some(v)) => match v.as_str() {
                "true" | "auto" => Ok(Some(PrimaryKey::Auto)),
                "natural" => Ok(Some(PrimaryKey::Natural)),
                "false" => Ok(None),
                _ => Err(InvalidTagValue {
                    key: keys::PRIMARY_KEY,
                    value: v.clone(),
                    expected: "one of true, auto, natural, false",
                }),
            },
        }
    }

    /// Declared maximum string length.
    pub fn max_length(&self) -> Result<Option<usize>, InvalidTagValue> {
        match self.options.get(keys::MAX_LENGTH) {
            None => Ok(None),
            Some(value) => {
                let raw = value.as_deref().unwrap_or_default();
                match raw.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(Some(n)),
                    _ => Err(InvalidTagValue {
                        key: keys::MAX_LENGTH,
                        value: raw.to_string(),
                        expected: "a positive integer",
                    }),
                }
            }
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, InvalidTagValue> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(InvalidTagValue {
            key,
            value: value.to_string(),
            expected: "true or false",
        }),
    }
}

impl FromStr for Tag {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.options {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            match value {
                Some(v) => write!(f, "{}={}", key, v)?,
                None => f.write_str(key)?,
            }
        }
        Ok(())
    }
}

impl serde::Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        Tag::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keys_and_values() {
        let tag = Tag::parse("primary_key, max_length=64 ,default='x'").unwrap();
        assert!(tag.has("primary_key"));
        assert_eq!(tag.value("primary_key"), None);
        assert_eq!(tag.value("max_length"), Some("64"));
        assert_eq!(tag.value("default"), Some("'x'"));
        assert!(!tag.has("unique"));
    }

    #[test]
    fn parse_skips_empty_entries() {
        let tag = Tag::parse(",,unique,").unwrap();
        assert!(tag.has("unique"));
        assert!(Tag::parse("").unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_bad_keys() {
        assert_eq!(
            Tag::parse("=1"),
            Err(TagParseError::EmptyKey("=1".to_string()))
        );
        assert!(matches!(
            Tag::parse("Primary Key"),
            Err(TagParseError::InvalidKey(_))
        ));
        assert_eq!(
            Tag::parse("unique,unique"),
            Err(TagParseError::DuplicateKey("unique".to_string()))
        );
    }

    #[test]
    fn display_is_canonical() {
        let tag = Tag::parse("unique, max_length=8,primary_key").unwrap();
        assert_eq!(tag.to_string(), "max_length=8,primary_key,unique");
        assert_eq!(Tag::parse(&tag.to_string()).unwrap(), tag);
    }

    #[test]
    fn primary_key_variants() {
        assert_eq!(Tag::new().primary_key(), Ok(None));
        assert_eq!(
            Tag::parse("primary_key").unwrap().primary_key(),
            Ok(Some(PrimaryKey::Auto))
        );
        assert_eq!(
            Tag::parse("primary_key=true").unwrap().primary_key(),
            Ok(Some(PrimaryKey::Auto))
        );
        assert_eq!(
            Tag::parse("primary_key=natural").unwrap().primary_key(),
            Ok(Some(PrimaryKey::Natural))
        );
        assert!(Tag::parse("primary_key=maybe")
            .unwrap()
            .primary_key()
            .is_err());
    }

    #[test]
    fn max_length_must_be_positive() {
        assert_eq!(
            Tag::parse("max_length=10").unwrap().max_length(),
            Ok(Some(10))
        );
        assert!(Tag::parse("max_length=0").unwrap().max_length().is_err());
        assert!(Tag::parse("max_length").unwrap().max_length().is_err());
    }

    #[test]
    fn flag_accepts_bare_and_boolean_values() {
        let tag = Tag::parse("unique,not_null=false").unwrap();
        assert_eq!(tag.flag(keys::UNIQUE), Ok(true));
        assert_eq!(tag.flag(keys::NOT_NULL), Ok(false));
        assert_eq!(tag.flag(keys::AUTO_INCREMENT), Ok(false));
        assert!(Tag::parse("unique=yes").unwrap().flag(keys::UNIQUE).is_err());
    }

    #[test]
    fn deserialize_from_json_string() {
        let tag: Tag = serde_json::from_str("\"primary_key,column=user_id\"").unwrap();
        assert_eq!(tag.value("column"), Some("user_id"));
        assert!(serde_json::from_str::<Tag>("\"A\"").is_err());
    }
}
