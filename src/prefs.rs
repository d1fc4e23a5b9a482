//! Persistence of the chosen language.

use std::io;
use std::path::PathBuf;

use serde_json::{
    Map,
    Value,
};
use thiserror::Error;

use crate::types::LanguageTag;

/// Failure to read or write the preference store.
///
/// Persistence is best effort: the engine logs these and carries on, so a
/// broken store never blocks translation.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to access preference store: {0}")]
    Io(#[from] io::Error),
    #[error("Preference store content is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Remembers the language chosen in earlier runs.
pub trait PreferenceStore {
    /// Loads the stored preference, `None` when nothing was stored yet.
    fn load(
        &self,
    ) -> impl Future<Output = Result<Option<LanguageTag>, PersistenceError>> + Send;

    /// Stores `tag` as the preference for the next run.
    fn save(
        &mut self,
        tag: &LanguageTag,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Keeps the preference in memory only; it does not outlive the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPrefs(Option<LanguageTag>);

impl MemoryPrefs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a preference.
    #[must_use]
    pub fn with_stored(tag: impl Into<LanguageTag>) -> Self {
        Self(Some(tag.into()))
    }

    /// The currently held preference.
    #[must_use]
    pub fn stored(&self) -> Option<&LanguageTag> {
        self.0.as_ref()
    }
}

impl PreferenceStore for MemoryPrefs {
    async fn load(&self) -> Result<Option<LanguageTag>, PersistenceError> {
        Ok(self.0.clone())
    }

    async fn save(&mut self, tag: &LanguageTag) -> Result<(), PersistenceError> {
        self.0 = Some(tag.clone());
        Ok(())
    }
}

/// Stores the preference in a JSON file under a configurable field name.
///
/// Other fields in the file are preserved on save, so the file can be shared
/// with unrelated application settings.
#[derive(Debug, Clone)]
pub struct FsPrefs {
    path: PathBuf,
    key: String,
}

impl FsPrefs {
    /// Creates a store backed by the file at `path`, reading and writing the
    /// `key` field.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self { path: path.into(), key: key.into() }
    }

    async fn read_map(&self) -> Result<Option<Map<String, Value>>, PersistenceError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value: Value = serde_json::from_str(&text)?;
        match value {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(None),
        }
    }
}

impl PreferenceStore for FsPrefs {
    async fn load(&self) -> Result<Option<LanguageTag>, PersistenceError> {
        let Some(map) = self.read_map().await? else {
            tracing::debug!("Preference file not found: {:?}", self.path);
            return Ok(None);
        };
        Ok(map.get(&self.key).and_then(Value::as_str).map(LanguageTag::new))
    }

    async fn save(&mut self, tag: &LanguageTag) -> Result<(), PersistenceError> {
        // A malformed existing file is replaced rather than propagated.
        let mut map = self.read_map().await.unwrap_or_default().unwrap_or_default();
        map.insert(self.key.clone(), Value::String(tag.to_string()));

        let text = serde_json::to_string_pretty(&Value::Object(map))?;
        tokio::fs::write(&self.path, text).await?;
        Ok(())
    }
}
