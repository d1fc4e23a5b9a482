//! Dictionary retrieval collaborators.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::dictionary::Dictionary;
use crate::types::LanguageTag;

/// Failure to retrieve a language's dictionary.
#[derive(Error, Debug)]
pub enum SourceError {
    /// No dictionary exists for the requested tag.
    #[error("No dictionary found for language '{0}'")]
    NotFound(LanguageTag),
    /// The payload could not be read.
    #[error("Failed to read dictionary for language '{tag}': {source}")]
    Io {
        tag: LanguageTag,
        #[source]
        source: io::Error,
    },
    /// The payload was not valid JSON.
    #[error("Failed to parse dictionary for language '{tag}': {source}")]
    Parse {
        tag: LanguageTag,
        #[source]
        source: serde_json::Error,
    },
}

/// Retrieves one language's dictionary tree.
///
/// The engine treats the source as opaque: given a tag it either yields a
/// tree or fails with a retrieval error, and it may suspend while doing so.
/// While a fetch is in flight the previously active dictionary stays
/// readable; the engine swaps only after the fetch completes.
pub trait DictionarySource {
    /// Fetches the dictionary for `tag`.
    fn fetch(
        &self,
        tag: &LanguageTag,
    ) -> impl Future<Output = Result<Dictionary, SourceError>> + Send;
}

/// Loads dictionaries from `<dir>/<tag>.json` files.
///
/// File names use the normalized tag text, so the dictionary for `en_US`
/// lives in `en-us.json`.
#[derive(Debug, Clone)]
pub struct FsSource {
    dir: PathBuf,
}

impl FsSource {
    /// Creates a source rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, tag: &LanguageTag) -> Option<PathBuf> {
        // The tag text becomes a file name; refuse path separators.
        if tag.as_str().is_empty()
            || tag.as_str().contains(['/', '\\'])
            || tag.as_str().contains("..")
        {
            return None;
        }
        Some(self.dir.join(format!("{tag}.json")))
    }
}

impl DictionarySource for FsSource {
    async fn fetch(&self, tag: &LanguageTag) -> Result<Dictionary, SourceError> {
        let Some(path) = self.path_for(tag) else {
            return Err(SourceError::NotFound(tag.clone()));
        };

        tracing::debug!(lang = %tag, path = %path.display(), "Loading dictionary file");
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(tag.clone()));
            }
            Err(source) => return Err(SourceError::Io { tag: tag.clone(), source }),
        };

        let value: Value = serde_json::from_str(&text)
            .map_err(|source| SourceError::Parse { tag: tag.clone(), source })?;

        Ok(Dictionary::from_value(&value))
    }
}

/// Serves dictionaries from an in-memory table.
///
/// Suited to embedded translation sets and to tests; fetching never touches
/// the file system.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    dictionaries: HashMap<LanguageTag, Dictionary>,
}

impl StaticSource {
    /// Creates an empty source; every fetch fails until languages are added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of one language's payload.
    #[must_use]
    pub fn with(mut self, tag: impl Into<LanguageTag>, payload: Value) -> Self {
        self.dictionaries.insert(tag.into(), Dictionary::from_value(&payload));
        self
    }

    /// Tags this source can serve.
    pub fn tags(&self) -> impl Iterator<Item = &LanguageTag> {
        self.dictionaries.keys()
    }
}

impl DictionarySource for StaticSource {
    async fn fetch(&self, tag: &LanguageTag) -> Result<Dictionary, SourceError> {
        self.dictionaries.get(tag).cloned().ok_or_else(|| SourceError::NotFound(tag.clone()))
    }
}
