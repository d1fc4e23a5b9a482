//! Core types used throughout the project.

use std::collections::BTreeMap;
use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

/// A normalized language tag (e.g. `"en"`, `"ja"`, `"en-us"`).
///
/// Tags are normalized on construction: surrounding whitespace trimmed,
/// ASCII-lowercased, `_` folded to `-`. `"en_US"` and `"en-us"` therefore
/// name the same language. Which tags are actually usable is decided by the
/// configured available set, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Creates a tag from a raw string, normalizing it.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self(raw.trim().to_ascii_lowercase().replace('_', "-"))
    }

    /// The normalized tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LanguageTag {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for LanguageTag {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named parameters substituted into a resolved translation.
///
/// Values are stringified at insertion time. The map is ordered so that the
/// cache key derived from it does not depend on insertion order. Parameters
/// exist only for the duration of a single resolution and are never
/// persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// ```
    /// use dom_i18n::Params;
    ///
    /// let params = Params::new().set("name", "John").set("count", 3);
    /// assert_eq!(params.get("count"), Some("3"));
    /// ```
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(name.into(), value.to_string());
        self
    }

    /// Inserts a parameter in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    /// Looks up a parameter by placeholder name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
