//! Engine configuration.

use std::path::{
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::types::LanguageTag;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "availableLanguages[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Attribute names that mark an element as a translation target.
///
/// Each marker attribute carries a translation key; which part of the
/// element receives the resolved text depends on the marker. The aria-label
/// marker is a fixed attribute name and is not configurable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkerSettings {
    /// Marks the element's text content (or value for form fields).
    pub content: String,
    /// Marks the `placeholder` attribute.
    pub placeholder: String,
    /// Marks the `title` attribute.
    pub title: String,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            content: "data-i18n".to_string(),
            placeholder: "data-i18n-placeholder".to_string(),
            title: "data-i18n-title".to_string(),
        }
    }
}

/// Translation engine settings.
///
/// Every field is optional in serialized form; omitted fields take their
/// defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Directory holding `<tag>.json` dictionary files.
    ///
    /// Consulted only by the file-source convenience constructor; sessions
    /// built around an explicit source ignore it.
    pub source_dir: Option<PathBuf>,

    /// Language activated when neither preference nor environment decide.
    pub default_language: String,
    /// Language retried once when an activation fails to load.
    pub fallback_language: String,
    /// Closed set of languages the engine may activate.
    pub available_languages: Vec<String>,

    /// Field name under which the chosen language is persisted.
    pub preference_key: String,
    /// Whether the host locale is consulted during initial selection.
    pub detect_environment: bool,

    pub markers: MarkerSettings,

    /// Upper bound on queued document mutations per subscriber.
    ///
    /// When the queue overflows, the synchronizer falls back to one full
    /// pass instead of dropping updates.
    pub mutation_queue_limit: usize,

    /// Whether resolution misses and substitutions are logged.
    pub diagnostics: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            source_dir: None,
            default_language: "en".to_string(),
            fallback_language: "en".to_string(),
            available_languages: vec!["en".to_string()],
            preference_key: "lang".to_string(),
            detect_environment: true,
            markers: MarkerSettings::default(),
            mutation_queue_limit: 64,
            diagnostics: true,
        }
    }
}

impl EngineSettings {
    /// # Errors
    /// - Required field is empty
    /// - Default or fallback language not listed as available
    /// - Marker attribute names collide
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.default_language.trim().is_empty() {
            errors.push(ValidationError::new(
                "defaultLanguage",
                "The language tag cannot be empty. Example: \"en\"",
            ));
        }

        if self.fallback_language.trim().is_empty() {
            errors.push(ValidationError::new(
                "fallbackLanguage",
                "The language tag cannot be empty. Example: \"en\"",
            ));
        }

        if self.available_languages.is_empty() {
            errors.push(ValidationError::new(
                "availableLanguages",
                "At least one language is required. Example: [\"en\", \"ja\"]",
            ));
        }

        for (index, tag) in self.available_languages.iter().enumerate() {
            if tag.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("availableLanguages[{index}]"),
                    "The language tag cannot be empty",
                ));
            }
        }

        let available = self.available_tags();
        if !self.default_language.trim().is_empty() && !available.contains(&self.default_tag()) {
            errors.push(ValidationError::new(
                "defaultLanguage",
                format!(
                    "'{}' is not listed in availableLanguages. Please add it to the list",
                    self.default_language
                ),
            ));
        }

        if !self.fallback_language.trim().is_empty() && !available.contains(&self.fallback_tag()) {
            errors.push(ValidationError::new(
                "fallbackLanguage",
                format!(
                    "'{}' is not listed in availableLanguages. Please add it to the list",
                    self.fallback_language
                ),
            ));
        }

        if self.preference_key.trim().is_empty() {
            errors.push(ValidationError::new(
                "preferenceKey",
                "The key cannot be empty. Example: \"lang\"",
            ));
        }

        let markers = [
            ("content", &self.markers.content),
            ("placeholder", &self.markers.placeholder),
            ("title", &self.markers.title),
        ];
        for (name, attribute) in markers {
            if attribute.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("markers.{name}"),
                    "The attribute name cannot be empty. Example: \"data-i18n\"",
                ));
            }
        }
        if self.markers.content == self.markers.placeholder
            || self.markers.content == self.markers.title
            || self.markers.placeholder == self.markers.title
        {
            errors.push(ValidationError::new(
                "markers",
                "Marker attribute names must be distinct from each other",
            ));
        }

        if self.mutation_queue_limit == 0 {
            errors.push(ValidationError::new("mutationQueueLimit", "The limit must be at least 1"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// The default language as a normalized tag.
    #[must_use]
    pub fn default_tag(&self) -> LanguageTag {
        LanguageTag::new(self.default_language.as_str())
    }

    /// The fallback language as a normalized tag.
    #[must_use]
    pub fn fallback_tag(&self) -> LanguageTag {
        LanguageTag::new(self.fallback_language.as_str())
    }

    /// The available set as normalized tags, in configured order.
    #[must_use]
    pub fn available_tags(&self) -> Vec<LanguageTag> {
        self.available_languages.iter().map(LanguageTag::new).collect()
    }

    /// Whether `tag` is a member of the available set.
    #[must_use]
    pub fn is_available(&self, tag: &LanguageTag) -> bool {
        self.available_languages.iter().any(|raw| &LanguageTag::new(raw.as_str()) == tag)
    }

    /// Loads settings from a JSON file.
    ///
    /// # Returns
    /// - `Ok(Some(settings))`: the file exists and parsed
    /// - `Ok(None)`: the file does not exist
    /// - `Err(ConfigError)`: read or parse failure
    ///
    /// # Errors
    /// - File read error
    /// - JSON parse error
    pub fn load_from_path(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            tracing::debug!("Configuration file not found: {:?}", path);
            return Ok(None);
        }

        tracing::debug!("Loading configuration from: {:?}", path);

        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;

        Ok(Some(settings))
    }
}
