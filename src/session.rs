//! Translation session: active dictionary, cache, and activation policy.

use std::fmt;

use thiserror::Error;
use tokio::sync::watch;

use crate::cache::TranslationCache;
use crate::config::{
    ConfigError,
    EngineSettings,
    ValidationError,
};
use crate::dictionary::Dictionary;
use crate::dom::sync::DomSynchronizer;
use crate::prefs::{
    MemoryPrefs,
    PreferenceStore,
};
use crate::selector::{
    select_initial,
    Environment,
};
use crate::source::{
    DictionarySource,
    FsSource,
    SourceError,
};
use crate::types::{
    LanguageTag,
    Params,
};

/// Activation failed with no further recovery.
#[derive(Error, Debug)]
pub enum ActivationError {
    /// The fallback language itself could not be loaded. The previously
    /// active language, if any, remains in effect.
    #[error("Failed to activate '{requested}': fallback language '{fallback}' could not be loaded")]
    FallbackFailed {
        requested: LanguageTag,
        fallback: LanguageTag,
        #[source]
        source: SourceError,
    },

    /// A newer activation was issued while this one was in flight; its
    /// result was discarded.
    #[error("Activation was superseded by a newer request")]
    Superseded,
}

/// An issued activation, waiting for its dictionary fetch to complete.
///
/// Produced by [`I18nSession::begin_activation`] and consumed by
/// [`I18nSession::complete_activation`]. The sequence number decides which
/// in-flight activation is allowed to apply its result: only the latest
/// issued one wins, everything older completes as superseded.
#[derive(Debug)]
#[must_use = "an activation request does nothing until completed"]
pub struct ActivationRequest {
    seq: u64,
    tag: LanguageTag,
    requested: LanguageTag,
    fallback: bool,
}

impl ActivationRequest {
    /// The language this request will try to load.
    #[must_use]
    pub const fn tag(&self) -> &LanguageTag {
        &self.tag
    }

    /// The language the caller originally asked for, before any
    /// availability substitution or fallback retry.
    #[must_use]
    pub const fn requested(&self) -> &LanguageTag {
        &self.requested
    }

    /// The activation sequence number.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Whether this request loads the fallback language, either directly
    /// or as the bounded retry of an earlier failure.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// What completing an activation request did to the session.
#[derive(Debug)]
#[must_use = "the outcome decides whether a fallback fetch is still needed"]
pub enum ActivationOutcome {
    /// The dictionary was swapped in and the language is now active.
    Activated(LanguageTag),
    /// The fetch failed; retry exactly once with this fallback request.
    /// The retry keeps the sequence number of the original request.
    RetryWithFallback(ActivationRequest),
    /// A newer activation was issued meanwhile; nothing was changed.
    Superseded,
    /// The fallback itself failed; nothing was changed.
    Failed(ActivationError),
}

/// Cumulative session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Resolutions that consulted the dictionary (cache misses).
    pub resolutions: u64,
    /// Resolutions that found no leaf and degraded to the raw key.
    pub misses: u64,
    /// Entries currently memoized.
    pub cached: usize,
    /// Leaf entries in the active dictionary.
    pub dictionary_leaves: usize,
}

/// 翻訳セッション
///
/// Owns the active dictionary, the translation cache, and the activation
/// state. There is no ambient global: callers hold the session and pass it
/// where resolution is needed.
///
/// `resolve` never fails. A key that cannot be resolved comes back as the
/// key text itself, so rendered output is never blank.
pub struct I18nSession<S, P> {
    settings: EngineSettings,
    source: S,
    prefs: P,
    dictionary: Dictionary,
    active: Option<LanguageTag>,
    cache: TranslationCache,
    /// Sequence number handed to the next activation.
    next_seq: u64,
    /// Sequence number of the most recently issued activation; only its
    /// completion may apply.
    latest_issued: u64,
    /// Republishes the active tag on every successful activation;
    /// synchronizers watch it.
    changes: watch::Sender<Option<LanguageTag>>,
}

impl<S, P> I18nSession<S, P> {
    /// Creates a session over an explicit dictionary source and preference
    /// store.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationErrors` when the settings are
    /// inconsistent.
    pub fn new(settings: EngineSettings, source: S, prefs: P) -> Result<Self, ConfigError> {
        settings.validate().map_err(ConfigError::ValidationErrors)?;
        let cache = TranslationCache::new(settings.diagnostics);
        let (changes, _) = watch::channel(None);
        Ok(Self {
            settings,
            source,
            prefs,
            dictionary: Dictionary::empty(),
            active: None,
            cache,
            next_seq: 1,
            latest_issued: 0,
            changes,
        })
    }

    /// The currently active language, `None` before the first successful
    /// activation.
    #[must_use]
    pub fn active(&self) -> Option<&LanguageTag> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn preferences(&self) -> &P {
        &self.prefs
    }

    /// Resolves a key against the active dictionary, memoized.
    ///
    /// Total: misses degrade to the key text, absent parameters stay as
    /// literal tokens. Before the first activation every key misses.
    pub fn resolve(&mut self, key: &str, params: &Params) -> String {
        self.cache.resolve(&self.dictionary, key, params)
    }

    /// Drops every memoized entry. Counters and the missing-key record
    /// survive; the next resolution of each key consults the dictionary
    /// again.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Counters describing cache and dictionary state.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            resolutions: self.cache.resolutions(),
            misses: self.cache.misses(),
            cached: self.cache.len(),
            dictionary_leaves: self.dictionary.leaf_count(),
        }
    }

    /// Keys that have ever missed, in sorted order.
    pub fn missing_keys(&self) -> impl Iterator<Item = &str> {
        self.cache.missing_keys()
    }

    /// Watches for successful activations.
    ///
    /// The value is the currently active tag, republished on every
    /// dictionary swap. A synchronizer treats any observed change as
    /// "re-translate everything".
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<LanguageTag>> {
        self.changes.subscribe()
    }

    /// Creates a synchronizer wired to this session's marker configuration
    /// and activation signal.
    #[must_use]
    pub fn synchronizer(&self) -> DomSynchronizer {
        DomSynchronizer::new(
            self.settings.markers.clone(),
            self.settings.mutation_queue_limit,
            self.subscribe(),
        )
    }

    /// Issues an activation request for `tag`.
    ///
    /// A tag outside the available set is substituted with the fallback
    /// language before any fetch happens. Issuing a new request supersedes
    /// every earlier one still in flight.
    pub fn begin_activation(&mut self, tag: LanguageTag) -> ActivationRequest {
        let requested = tag.clone();
        let (tag, fallback) = if self.settings.is_available(&tag) {
            let fallback = tag == self.settings.fallback_tag();
            (tag, fallback)
        } else {
            if self.settings.diagnostics {
                tracing::warn!(
                    lang = %tag,
                    fallback = %self.settings.fallback_tag(),
                    "Language is not available, substituting fallback"
                );
            }
            (self.settings.fallback_tag(), true)
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.latest_issued = seq;
        tracing::debug!(lang = %tag, seq, "Activation issued");
        ActivationRequest { seq, tag, requested, fallback }
    }

    /// Applies the result of a dictionary fetch for `request`.
    ///
    /// Only the latest issued request may change the session; older ones
    /// complete as [`ActivationOutcome::Superseded`] no matter whether
    /// their fetch succeeded. On success the dictionary is swapped, the
    /// cache is cleared, and the change watch republishes the new tag,
    /// all before any further resolution can run. On failure the session is left
    /// untouched and the caller either retries with the returned fallback
    /// request or, when the fallback itself failed, gives up.
    ///
    /// [`I18nSession::activate`] drives this loop and also persists the
    /// preference; callers working with raw requests handle persistence
    /// themselves.
    pub fn complete_activation(
        &mut self,
        request: ActivationRequest,
        result: Result<Dictionary, SourceError>,
    ) -> ActivationOutcome {
        if request.seq != self.latest_issued {
            tracing::debug!(lang = %request.tag, seq = request.seq, "Stale activation discarded");
            return ActivationOutcome::Superseded;
        }

        match result {
            Ok(dictionary) => {
                tracing::debug!(
                    lang = %request.tag,
                    seq = request.seq,
                    entries = dictionary.leaf_count(),
                    "Language activated"
                );
                self.dictionary = dictionary;
                self.cache.clear();
                self.active = Some(request.tag.clone());
                self.changes.send_replace(Some(request.tag.clone()));
                ActivationOutcome::Activated(request.tag)
            }
            Err(source) if request.fallback => {
                tracing::error!(
                    lang = %request.tag,
                    error = %source,
                    "Fallback language failed to load, keeping prior state"
                );
                ActivationOutcome::Failed(ActivationError::FallbackFailed {
                    requested: request.requested,
                    fallback: request.tag,
                    source,
                })
            }
            Err(source) => {
                if self.settings.diagnostics {
                    tracing::warn!(
                        lang = %request.tag,
                        error = %source,
                        fallback = %self.settings.fallback_tag(),
                        "Dictionary fetch failed, retrying with fallback"
                    );
                }
                ActivationOutcome::RetryWithFallback(ActivationRequest {
                    seq: request.seq,
                    tag: self.settings.fallback_tag(),
                    requested: request.requested,
                    fallback: true,
                })
            }
        }
    }
}

impl<S: DictionarySource, P: PreferenceStore> I18nSession<S, P> {
    /// Selects and activates the initial language.
    ///
    /// Priority: the stored preference when it is available, then the host
    /// locale when environment detection is enabled, then the configured
    /// default. A failed preference load counts as no preference.
    ///
    /// # Errors
    /// Propagates the terminal activation failure; see [`Self::activate`].
    pub async fn init(&mut self) -> Result<LanguageTag, ActivationError> {
        let stored = match self.prefs.load().await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::debug!("Failed to load language preference: {err}");
                None
            }
        };

        let environment = if self.settings.detect_environment {
            Environment::detect()
        } else {
            Environment::none()
        };

        let selected = select_initial(
            stored.as_ref(),
            &environment,
            &self.settings.available_tags(),
            &self.settings.default_tag(),
        );
        tracing::debug!(lang = %selected, "Initial language selected");

        self.activate(selected).await
    }

    /// Activates `tag`, driving the full policy: availability substitution,
    /// the single fallback retry, supersession, and best-effort persistence
    /// of the chosen language.
    ///
    /// While the fetch is in flight the previous dictionary stays readable;
    /// the swap is a single synchronous step after the fetch completes.
    ///
    /// # Errors
    /// - [`ActivationError::FallbackFailed`]: the fallback could not be
    ///   loaded; the previous language remains active.
    /// - [`ActivationError::Superseded`]: a newer activation won.
    pub async fn activate(
        &mut self,
        tag: impl Into<LanguageTag>,
    ) -> Result<LanguageTag, ActivationError> {
        let mut request = self.begin_activation(tag.into());
        loop {
            let result = self.source.fetch(request.tag()).await;
            match self.complete_activation(request, result) {
                ActivationOutcome::Activated(tag) => {
                    if let Err(err) = self.prefs.save(&tag).await {
                        tracing::debug!("Failed to persist language preference: {err}");
                    }
                    return Ok(tag);
                }
                ActivationOutcome::RetryWithFallback(retry) => request = retry,
                ActivationOutcome::Superseded => return Err(ActivationError::Superseded),
                ActivationOutcome::Failed(err) => return Err(err),
            }
        }
    }
}

impl I18nSession<FsSource, MemoryPrefs> {
    /// Creates a session reading dictionaries from `sourceDir`, with the
    /// preference kept in memory.
    ///
    /// # Errors
    /// Returns a validation error when `sourceDir` is unset or the settings
    /// are inconsistent.
    pub fn from_settings(settings: EngineSettings) -> Result<Self, ConfigError> {
        let Some(dir) = settings.source_dir.clone() else {
            return Err(ConfigError::ValidationErrors(vec![ValidationError::new(
                "sourceDir",
                "A dictionary directory is required. Example: \"./locales\"",
            )]));
        };
        Self::new(settings, FsSource::new(dir), MemoryPrefs::new())
    }
}

impl<S, P> fmt::Debug for I18nSession<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("I18nSession")
            .field("active", &self.active)
            .field("dictionary_leaves", &self.dictionary.leaf_count())
            .field("cached", &self.cache.len())
            .field("latest_issued", &self.latest_issued)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{
        AtomicUsize,
        Ordering,
    };
    use std::sync::Arc;

    use googletest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::source::StaticSource;
    use crate::test_utils::engine_settings;

    fn settings(available: &[&str], default: &str, fallback: &str) -> EngineSettings {
        let mut settings = engine_settings(available);
        settings.default_language = default.to_string();
        settings.fallback_language = fallback.to_string();
        settings
    }

    fn source() -> StaticSource {
        StaticSource::new()
            .with("en", json!({"hello": "Hello", "nav": {"home": "Home"}}))
            .with("ja", json!({"hello": "こんにちは", "nav": {"home": "ホーム"}}))
    }

    fn session(available: &[&str]) -> I18nSession<StaticSource, MemoryPrefs> {
        I18nSession::new(settings(available, "en", "en"), source(), MemoryPrefs::new()).unwrap()
    }

    #[googletest::test]
    fn resolve_before_activation_degrades_to_key() {
        let mut session = session(&["en", "ja"]);

        expect_that!(session.resolve("hello", &Params::new()), eq("hello"));
        expect_that!(session.active(), none());
    }

    #[tokio::test]
    async fn activate_swaps_dictionary_and_persists_preference() {
        let mut session = session(&["en", "ja"]);

        let activated = session.activate("ja").await.unwrap();

        assert_that!(activated, eq(&LanguageTag::new("ja")));
        assert_that!(session.active(), some(eq(&LanguageTag::new("ja"))));
        assert_that!(session.resolve("hello", &Params::new()), eq("こんにちは"));
        assert_that!(session.preferences().stored(), some(eq(&LanguageTag::new("ja"))));
    }

    #[tokio::test]
    async fn activation_clears_cached_entries_of_the_prior_language() {
        let mut session = session(&["en", "ja"]);
        session.activate("en").await.unwrap();

        assert_that!(session.resolve("hello", &Params::new()), eq("Hello"));
        let before = session.stats().resolutions;

        session.activate("ja").await.unwrap();

        assert_that!(session.resolve("hello", &Params::new()), eq("こんにちは"));
        assert_that!(session.stats().resolutions, eq(before + 1));
    }

    #[tokio::test]
    async fn unavailable_language_substitutes_fallback() {
        let mut session = session(&["en", "ja"]);

        let activated = session.activate("fr").await.unwrap();

        assert_that!(activated, eq(&LanguageTag::new("en")));
        assert_that!(session.active(), some(eq(&LanguageTag::new("en"))));
    }

    #[tokio::test]
    async fn failed_fetch_recovers_via_fallback() {
        // "de" is available but the source has no payload for it.
        let mut session =
            I18nSession::new(settings(&["en", "de"], "en", "en"), source(), MemoryPrefs::new())
                .unwrap();

        let activated = session.activate("de").await.unwrap();

        assert_that!(activated, eq(&LanguageTag::new("en")));
    }

    #[tokio::test]
    async fn failing_fallback_is_terminal_and_preserves_prior_state() {
        // Neither "de" nor the fallback "fr" exist in the source.
        let mut session =
            I18nSession::new(settings(&["en", "de", "fr"], "en", "fr"), source(), MemoryPrefs::new())
                .unwrap();
        session.activate("en").await.unwrap();

        let result = session.activate("de").await;

        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ActivationError::FallbackFailed { requested, fallback, .. }
                if requested == LanguageTag::new("de") && fallback == LanguageTag::new("fr")
        ));
        assert_that!(session.active(), some(eq(&LanguageTag::new("en"))));
        assert_that!(session.resolve("hello", &Params::new()), eq("Hello"));
    }

    /// 失敗した活性化は要求言語とフォールバックの 2 回だけ取得を試みる
    #[tokio::test]
    async fn terminal_failure_fetches_requested_then_fallback_only() {
        struct FailingSource {
            attempts: Arc<AtomicUsize>,
        }

        impl DictionarySource for FailingSource {
            async fn fetch(&self, tag: &LanguageTag) -> Result<Dictionary, SourceError> {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::NotFound(tag.clone()))
            }
        }

        let attempts = Arc::new(AtomicUsize::new(0));
        let source = FailingSource { attempts: Arc::clone(&attempts) };
        let mut session =
            I18nSession::new(settings(&["en", "de"], "en", "en"), source, MemoryPrefs::new())
                .unwrap();

        let result = session.activate("de").await;

        assert!(matches!(result.unwrap_err(), ActivationError::FallbackFailed { .. }));
        assert_that!(attempts.load(Ordering::SeqCst), eq(2));
        assert_that!(session.active(), none());
        assert_that!(session.preferences().stored(), none());
    }

    #[googletest::test]
    fn stale_completion_is_superseded() {
        let mut session = session(&["en", "ja"]);

        let first = session.begin_activation(LanguageTag::new("en"));
        let second = session.begin_activation(LanguageTag::new("ja"));

        // The older request completes last-to-arrive but must not apply.
        let outcome = session.complete_activation(
            first,
            Ok(Dictionary::from_value(&json!({"hello": "stale"}))),
        );
        assert!(matches!(outcome, ActivationOutcome::Superseded));
        expect_that!(session.active(), none());

        let outcome = session.complete_activation(
            second,
            Ok(Dictionary::from_value(&json!({"hello": "こんにちは"}))),
        );
        assert!(matches!(outcome, ActivationOutcome::Activated(_)));
        expect_that!(session.resolve("hello", &Params::new()), eq("こんにちは"));
    }

    #[googletest::test]
    fn fallback_retry_keeps_its_sequence_number() {
        let mut session = session(&["en", "ja"]);

        let request = session.begin_activation(LanguageTag::new("ja"));
        let seq = request.seq();

        let outcome = session
            .complete_activation(request, Err(SourceError::NotFound(LanguageTag::new("ja"))));

        let ActivationOutcome::RetryWithFallback(retry) = outcome else {
            panic!("expected fallback retry");
        };
        expect_that!(retry.seq(), eq(seq));
        expect_that!(retry.tag(), eq(&LanguageTag::new("en")));
        expect_that!(retry.requested(), eq(&LanguageTag::new("ja")));
        expect_that!(retry.is_fallback(), eq(true));
    }

    #[googletest::test]
    fn reads_during_inflight_activation_see_the_outgoing_language() {
        let mut session = session(&["en", "ja"]);
        let warm = session.begin_activation(LanguageTag::new("en"));
        let outcome = session
            .complete_activation(warm, Ok(Dictionary::from_value(&json!({"hello": "Hello"}))));
        assert!(matches!(outcome, ActivationOutcome::Activated(_)));

        let inflight = session.begin_activation(LanguageTag::new("ja"));

        // The fetch has not completed; readers still see the old language.
        expect_that!(session.resolve("hello", &Params::new()), eq("Hello"));

        let outcome = session.complete_activation(
            inflight,
            Ok(Dictionary::from_value(&json!({"hello": "こんにちは"}))),
        );
        assert!(matches!(outcome, ActivationOutcome::Activated(_)));
        expect_that!(session.resolve("hello", &Params::new()), eq("こんにちは"));
    }

    #[tokio::test]
    async fn init_prefers_the_stored_language() {
        let mut session = I18nSession::new(
            settings(&["en", "ja"], "en", "en"),
            source(),
            MemoryPrefs::with_stored("ja"),
        )
        .unwrap();

        let activated = session.init().await.unwrap();

        assert_that!(activated, eq(&LanguageTag::new("ja")));
    }

    #[tokio::test]
    async fn init_falls_back_to_the_default_language() {
        let mut session = session(&["en", "ja"]);

        let activated = session.init().await.unwrap();

        assert_that!(activated, eq(&LanguageTag::new("en")));
    }

    #[tokio::test]
    async fn change_watch_reports_the_activated_language() {
        let mut session = session(&["en", "ja"]);
        let mut changes = session.subscribe();
        assert_that!(changes.borrow_and_update().as_ref(), none());

        session.activate("ja").await.unwrap();

        assert_that!(changes.has_changed().unwrap(), eq(true));
        assert_that!(changes.borrow_and_update().as_ref(), some(eq(&LanguageTag::new("ja"))));
    }

    #[googletest::test]
    fn invalid_settings_are_rejected_at_construction() {
        let result = I18nSession::new(
            settings(&[], "en", "en"),
            StaticSource::new(),
            MemoryPrefs::new(),
        );

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationErrors(_)));
    }

    #[googletest::test]
    fn missing_keys_accumulate_for_reporting() {
        let mut session = session(&["en"]);

        session.resolve("nav.missing", &Params::new());
        session.resolve("footer.year", &Params::new());

        let missing: Vec<&str> = session.missing_keys().collect();
        expect_that!(missing, elements_are![eq(&"footer.year"), eq(&"nav.missing")]);
    }
}
