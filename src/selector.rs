//! Initial language selection policy.

use crate::types::LanguageTag;

/// The host's preferred-language signal, consulted only during initial
/// selection.
///
/// The raw locale string is normalized on construction: POSIX encoding and
/// modifier suffixes are stripped (`"en_US.UTF-8"` keeps `"en_US"`), then the
/// remainder is folded the same way [`LanguageTag`] folds tags. An absent or
/// empty signal never matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment(Option<String>);

impl Environment {
    /// Reads the host locale from the operating system.
    #[must_use]
    pub fn detect() -> Self {
        match sys_locale::get_locale() {
            Some(locale) => Self::from_locale(locale),
            None => Self::none(),
        }
    }

    /// Wraps an explicit locale string, normalizing it.
    #[must_use]
    pub fn from_locale(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let base = raw.split(['.', '@']).next().unwrap_or_default();
        let normalized = LanguageTag::new(base);
        if normalized.as_str().is_empty() {
            Self(None)
        } else {
            Self(Some(normalized.as_str().to_string()))
        }
    }

    /// A signal that matches nothing, for hosts with no locale configured.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// The normalized locale string, when one is present.
    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Whether the signal prefers `tag`, by case-insensitive prefix match.
    ///
    /// A signal of `"en-us"` prefers both `"en"` and `"en-us"`, but a signal
    /// of `"en"` does not prefer `"en-us"`.
    #[must_use]
    pub fn prefers(&self, tag: &LanguageTag) -> bool {
        self.0.as_deref().is_some_and(|locale| locale.starts_with(tag.as_str()))
    }
}

/// Picks the language to activate first.
///
/// Priority, first match wins:
/// 1. `stored` preference, if it is a member of `available`
/// 2. the first tag in `available` that `environment` prefers
/// 3. `default`
///
/// Always yields a tag; there is no failure path. The returned tag is not
/// guaranteed to load, only to be the best candidate to try.
#[must_use]
pub fn select_initial(
    stored: Option<&LanguageTag>,
    environment: &Environment,
    available: &[LanguageTag],
    default: &LanguageTag,
) -> LanguageTag {
    if let Some(preference) = stored
        && available.contains(preference)
    {
        return preference.clone();
    }

    if let Some(preferred) = available.iter().find(|tag| environment.prefers(tag)) {
        return preferred.clone();
    }

    default.clone()
}
