//! Keeps a live document's marked elements in step with the session.
//!
//! The synchronizer owns no document and no session; both are handed in
//! per call. It carries only the marker configuration, its mutation
//! subscription, and a watch on the session's language changes.

use tokio::sync::watch;

use crate::config::MarkerSettings;
use crate::dom::document::{
    Document,
    Mutation,
    NodeId,
    SubscriptionId,
};
use crate::session::I18nSession;
use crate::types::{
    LanguageTag,
    Params,
};

/// Marker for ARIA label translation, applied to the `aria-label`
/// attribute. Unlike the content, placeholder, and title markers this name
/// is not configurable.
pub const ARIA_MARKER: &str = "data-i18n-aria";

/// Lifecycle of a synchronizer. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Created but not yet attached to a document.
    Uninitialized,
    /// Attached: translated once in full and following mutations.
    Observing,
    /// Detached for good; every further call is a no-op.
    Disposed,
}

/// Applies session translations to marked elements of a [`Document`].
///
/// Attaching runs one full pass and subscribes to mutations; after that,
/// [`DomSynchronizer::pump`] translates newly inserted subtrees without
/// touching the rest of the document. Two events widen a pump back to a
/// full pass: a queue overflow, and a language activation observed on the
/// session's change watch.
#[derive(Debug)]
pub struct DomSynchronizer {
    markers: MarkerSettings,
    queue_limit: usize,
    refresh: watch::Receiver<Option<LanguageTag>>,
    subscription: Option<SubscriptionId>,
    state: SyncState,
}

impl DomSynchronizer {
    /// Creates a synchronizer; [`I18nSession::synchronizer`] is the usual
    /// way to get one with matching configuration.
    #[must_use]
    pub const fn new(
        markers: MarkerSettings,
        queue_limit: usize,
        refresh: watch::Receiver<Option<LanguageTag>>,
    ) -> Self {
        Self {
            markers,
            queue_limit,
            refresh,
            subscription: None,
            state: SyncState::Uninitialized,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    /// Subscribes to the document's mutations and translates it in full.
    ///
    /// Returns the number of elements a translation was applied to.
    /// Attaching an already observing synchronizer does not subscribe a
    /// second time; a disposed one stays disposed.
    pub fn attach<S, P>(
        &mut self,
        document: &mut Document,
        session: &mut I18nSession<S, P>,
    ) -> usize {
        if self.state != SyncState::Uninitialized {
            return 0;
        }
        self.subscription = Some(document.subscribe(self.queue_limit));
        self.state = SyncState::Observing;
        // Swallow any activation that happened before attachment; the full
        // pass below already reflects it.
        let _ = self.refresh.borrow_and_update();
        self.full_sync(document, session)
    }

    /// Processes pending mutations and activation signals.
    ///
    /// A language activation or a queue overflow is handled as one full
    /// pass covering everything the queue recorded. Otherwise each
    /// recorded insertion is translated as a subtree walk, so the cost is
    /// bounded by the inserted content. Returns the number of translation
    /// applications; overlapping inserted subtrees may count an element
    /// once per walk.
    pub fn pump<S, P>(
        &mut self,
        document: &mut Document,
        session: &mut I18nSession<S, P>,
    ) -> usize {
        if self.state != SyncState::Observing {
            return 0;
        }

        if self.refresh.has_changed().unwrap_or(false) {
            let _ = self.refresh.borrow_and_update();
            if let Some(subscription) = self.subscription {
                document.drain(subscription);
            }
            tracing::debug!("Language changed, re-translating the document");
            return self.full_sync(document, session);
        }

        let Some(subscription) = self.subscription else {
            return 0;
        };
        let mutations = document.drain(subscription);
        if mutations.contains(&Mutation::Overflow) {
            tracing::debug!("Mutation queue overflowed, re-translating the document");
            return self.full_sync(document, session);
        }

        let mut applied = 0;
        for mutation in mutations {
            // An insertion whose subtree was detached again before this pump
            // is invisible; translating it would only be wasted work.
            if let Mutation::Inserted(id) = mutation
                && document.is_attached(id)
            {
                applied += self.sync_subtree(document, session, id);
            }
        }
        applied
    }

    /// Translates every marked element of the document.
    pub fn full_sync<S, P>(
        &mut self,
        document: &mut Document,
        session: &mut I18nSession<S, P>,
    ) -> usize {
        if self.state == SyncState::Disposed {
            return 0;
        }
        self.sync_subtree(document, session, document.root())
    }

    /// Stops observing, detaches from the document, and releases the
    /// session's memoized translations. Terminal and idempotent.
    pub fn dispose<S, P>(&mut self, document: &mut Document, session: &mut I18nSession<S, P>) {
        if self.state == SyncState::Disposed {
            return;
        }
        if let Some(subscription) = self.subscription.take() {
            document.unsubscribe(subscription);
        }
        self.state = SyncState::Disposed;
        session.clear_cache();
        tracing::debug!("Synchronizer disposed");
    }

    fn sync_subtree<S, P>(
        &self,
        document: &mut Document,
        session: &mut I18nSession<S, P>,
        root: NodeId,
    ) -> usize {
        let params = Params::new();
        let mut applied = 0;
        for id in document.subtree(root) {
            if self.sync_element(document, session, id, &params) {
                applied += 1;
            }
        }
        applied
    }

    /// Applies every marker present on one element. Returns whether any
    /// translation was written.
    fn sync_element<S, P>(
        &self,
        document: &mut Document,
        session: &mut I18nSession<S, P>,
        id: NodeId,
        params: &Params,
    ) -> bool {
        let mut applied = false;

        // Keys are copied out first; applying a translation writes to the
        // document and would otherwise hold the borrow.
        if let Some(key) = document.attribute(id, &self.markers.content).map(str::to_owned) {
            let translated = session.resolve(&key, params);
            if matches!(document.tag(id), Some("input" | "textarea")) {
                document.set_value(id, &translated);
            } else {
                document.set_text(id, &translated);
            }
            applied = true;
        }

        let attribute_markers = [
            (self.markers.placeholder.as_str(), "placeholder"),
            (self.markers.title.as_str(), "title"),
            (ARIA_MARKER, "aria-label"),
        ];
        for (marker, target) in attribute_markers {
            let Some(key) = document.attribute(id, marker).map(str::to_owned) else {
                continue;
            };
            let translated = session.resolve(&key, params);
            document.set_attribute(id, target, &translated);
            applied = true;
        }

        applied
    }
}
