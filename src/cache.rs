//! Memoization of resolved translations.

use std::collections::{
    BTreeSet,
    HashMap,
};

use crate::dictionary::Dictionary;
use crate::interpolate::interpolate;
use crate::types::Params;

/// Introduces each parameter pair in a composed cache key.
const PAIR_START: char = '\u{1f}';
/// Separates a parameter name from its value inside a pair.
const PAIR_VALUE: char = '\u{1e}';

/// Memoizes `(key, params)` to fully resolved strings for one dictionary.
///
/// Entries are only ever valid for the dictionary instance they were resolved
/// against. The session clears the cache whenever the active dictionary is
/// replaced, so a stale cross-language entry is never observable. Misses are
/// cached too: the degraded key text is as stable a function of the
/// dictionary as a successful resolution is.
#[derive(Debug)]
pub struct TranslationCache {
    entries: HashMap<String, String>,
    missing: BTreeSet<String>,
    diagnostics: bool,
    resolutions: u64,
    misses: u64,
}

impl TranslationCache {
    /// Creates an empty cache.
    ///
    /// `diagnostics` controls whether resolution misses are logged; the
    /// degradation to raw key text happens either way.
    #[must_use]
    pub fn new(diagnostics: bool) -> Self {
        Self {
            entries: HashMap::new(),
            missing: BTreeSet::new(),
            diagnostics,
            resolutions: 0,
            misses: 0,
        }
    }

    /// Resolves a key through the cache.
    ///
    /// On a cache hit the memoized string is returned without touching the
    /// dictionary. On a cache miss the key is resolved against `dictionary`,
    /// interpolated when `params` is non-empty, stored, and returned. A key
    /// that cannot be resolved degrades to the key text itself, so the
    /// caller always receives a displayable string.
    pub fn resolve(&mut self, dictionary: &Dictionary, key: &str, params: &Params) -> String {
        let cache_key = compose_key(key, params);
        if let Some(hit) = self.entries.get(&cache_key) {
            return hit.clone();
        }

        self.resolutions += 1;
        let resolved = match dictionary.get(key) {
            Some(text) => {
                if params.is_empty() {
                    text.to_string()
                } else {
                    interpolate(text, params)
                }
            }
            None => {
                self.misses += 1;
                self.missing.insert(key.to_string());
                if self.diagnostics {
                    if dictionary.names_group(key) {
                        tracing::warn!(key = %key, "Translation key names a group, displaying raw key");
                    } else {
                        tracing::warn!(key = %key, "Translation key not found, displaying raw key");
                    }
                }
                key.to_string()
            }
        };
        self.entries.insert(cache_key, resolved.clone());
        resolved
    }

    /// Drops every entry.
    ///
    /// Counters and the missing-key set are cumulative across clears; they
    /// describe the session, not one dictionary.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of memoized entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total resolutions that had to consult the dictionary.
    #[must_use]
    pub const fn resolutions(&self) -> u64 {
        self.resolutions
    }

    /// Total resolutions that found no leaf for the key.
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// Every key that has ever missed, in sorted order.
    pub fn missing_keys(&self) -> impl Iterator<Item = &str> {
        self.missing.iter().map(String::as_str)
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Composes the cache key from the translation key and the parameter pairs.
///
/// Parameter pairs are joined in `Params` order with ASCII separator control
/// characters, so equal maps always produce equal keys and an empty map
/// composes to the key text alone.
fn compose_key(key: &str, params: &Params) -> String {
    let mut composed = String::with_capacity(key.len());
    composed.push_str(key);
    for (name, value) in params.iter() {
        composed.push(PAIR_START);
        composed.push_str(name);
        composed.push(PAIR_VALUE);
        composed.push_str(value);
    }
    composed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn dict() -> Dictionary {
        Dictionary::from_value(&json!({
            "hello": "Hello",
            "greeting": "Hello {name}",
            "nav": { "home": "Home" }
        }))
    }

    #[googletest::test]
    fn resolves_leaf_without_alteration() {
        let mut cache = TranslationCache::new(true);

        expect_that!(cache.resolve(&dict(), "hello", &Params::new()), eq("Hello"));
        expect_that!(cache.resolve(&dict(), "nav.home", &Params::new()), eq("Home"));
    }

    #[googletest::test]
    fn second_resolution_is_served_from_cache() {
        let mut cache = TranslationCache::new(true);
        let dictionary = dict();

        let first = cache.resolve(&dictionary, "hello", &Params::new());
        let second = cache.resolve(&dictionary, "hello", &Params::new());

        expect_that!(first, eq(second.as_str()));
        expect_that!(cache.resolutions(), eq(1));
        expect_that!(cache.len(), eq(1));
    }

    #[googletest::test]
    fn params_participate_in_the_cache_key() {
        let mut cache = TranslationCache::new(true);
        let dictionary = dict();

        let john = cache.resolve(&dictionary, "greeting", &Params::new().set("name", "John"));
        let jane = cache.resolve(&dictionary, "greeting", &Params::new().set("name", "Jane"));

        expect_that!(john, eq("Hello John"));
        expect_that!(jane, eq("Hello Jane"));
        expect_that!(cache.resolutions(), eq(2));
    }

    #[googletest::test]
    fn equal_params_hit_regardless_of_insertion_order() {
        let mut cache = TranslationCache::new(true);
        let dictionary = dict();

        cache.resolve(&dictionary, "greeting", &Params::new().set("a", 1).set("name", "John"));
        cache.resolve(&dictionary, "greeting", &Params::new().set("name", "John").set("a", 1));

        expect_that!(cache.resolutions(), eq(1));
    }

    #[rstest]
    #[case::absent_key("missing.key")]
    #[case::group_terminal("nav")]
    fn miss_degrades_to_raw_key(#[case] key: &str) {
        let mut cache = TranslationCache::new(true);

        assert_that!(cache.resolve(&dict(), key, &Params::new()), eq(key));
        assert_that!(cache.misses(), eq(1));
        assert_that!(cache.missing_keys().collect::<Vec<_>>(), elements_are![eq(&key)]);
    }

    #[googletest::test]
    fn repeated_miss_is_cached() {
        let mut cache = TranslationCache::new(false);
        let dictionary = dict();

        cache.resolve(&dictionary, "missing.key", &Params::new());
        cache.resolve(&dictionary, "missing.key", &Params::new());

        expect_that!(cache.resolutions(), eq(1));
        expect_that!(cache.misses(), eq(1));
    }

    #[googletest::test]
    fn clear_drops_entries_but_keeps_counters() {
        let mut cache = TranslationCache::new(true);
        let dictionary = dict();
        cache.resolve(&dictionary, "hello", &Params::new());
        cache.resolve(&dictionary, "missing.key", &Params::new());

        cache.clear();

        expect_that!(cache.is_empty(), eq(true));
        expect_that!(cache.resolutions(), eq(2));
        expect_that!(cache.misses(), eq(1));

        cache.resolve(&dictionary, "hello", &Params::new());
        expect_that!(cache.resolutions(), eq(3));
    }

    #[googletest::test]
    fn no_params_cache_key_is_the_key_itself() {
        expect_that!(compose_key("nav.home", &Params::new()), eq("nav.home"));
    }

    #[googletest::test]
    fn compose_key_separates_name_and_value() {
        let ambiguous_a = compose_key("k", &Params::new().set("ab", "c"));
        let ambiguous_b = compose_key("k", &Params::new().set("a", "bc"));

        expect_that!(ambiguous_a, not(eq(ambiguous_b.as_str())));
    }
}
