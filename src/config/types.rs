//! Settings types and validation.

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

/// One field-level validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "excludePatterns[0]")
    pub field_path: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error for one field.
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

/// Configuration loading/validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more fields failed validation.
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    /// The settings file could not be read.
    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// The settings file is not valid JSON.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Numbered, one-per-line rendering of validation errors.
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrapper for clients that namespace settings under `railsI18n`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    /// The actual settings.
    pub rails_i18n: RailsI18nSettings,
}

/// Server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RailsI18nSettings {
    /// Where locale documents live.
    pub translation_files: TranslationFilesConfig,

    /// Patterns removed from discovery (relative to the unit root).
    pub exclude_patterns: Vec<String>,

    /// When true, prefer the project's declared load paths
    /// (`I18n.load_path`) over the discovery glob. Falls back to the glob
    /// when the external tool is unavailable.
    pub load_all_translations: bool,

    /// Explicit default locale for every workspace unit. Only honored when
    /// the store actually has that locale; detection falls through
    /// otherwise.
    pub default_locale: Option<String>,

    /// Key path separator.
    pub key_separator: String,

    /// Document loading tunables.
    pub indexing: IndexingConfig,
}

/// Document loading tunables.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexingConfig {
    /// Concurrent document reads during a full load.
    /// Default: 80% of CPU cores (minimum 1).
    pub num_threads: Option<usize>,
}

impl IndexingConfig {
    /// The effective read concurrency.
    #[must_use]
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| (num_cpus::get().saturating_mul(4) / 5).max(1))
    }
}

/// Locale document location settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationFilesConfig {
    /// Discovery glob, relative to each unit root.
    pub file_pattern: String,
}

impl RailsI18nSettings {
    /// # Errors
    /// - Required field is empty
    /// - Invalid glob pattern
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.key_separator.is_empty() {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot be empty. Please specify a separator, for example: \".\" (dot)",
            ));
        }

        if self.translation_files.file_pattern.is_empty() {
            errors.push(ValidationError::new(
                "translationFiles.filePattern",
                "The pattern cannot be empty. Example: \"config/locales/**/*.yml\"",
            ));
        } else if let Err(e) = globset::Glob::new(&self.translation_files.file_pattern) {
            errors.push(ValidationError::new(
                "translationFiles.filePattern",
                format!("Invalid glob pattern '{}': {e}", self.translation_files.file_pattern),
            ));
        }

        for (index, pattern) in self.exclude_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("excludePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        if let Some(locale) = &self.default_locale
            && locale.is_empty()
        {
            errors.push(ValidationError::new(
                "defaultLocale",
                "The locale cannot be empty. Specify an identifier (e.g., \"en\"), or remove this field",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for TranslationFilesConfig {
    fn default() -> Self {
        Self { file_pattern: "config/locales/**/*.yml".to_string() }
    }
}

impl Default for RailsI18nSettings {
    fn default() -> Self {
        Self {
            translation_files: TranslationFilesConfig::default(),
            exclude_patterns: vec!["vendor/**".to_string(), "node_modules/**".to_string()],
            load_all_translations: false,
            default_locale: None,
            key_separator: ".".to_string(),
            indexing: IndexingConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn validate_valid_settings() {
        let settings = RailsI18nSettings::default();

        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn deserialize_partial_settings() {
        let json = r#"{"loadAllTranslations": true}"#;

        let settings: RailsI18nSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.load_all_translations, eq(true));
        assert_that!(settings.key_separator, eq("."));
        assert_that!(settings.translation_files.file_pattern, eq("config/locales/**/*.yml"));
    }

    #[rstest]
    fn deserialize_empty_settings() {
        let json = "{}";

        let settings: RailsI18nSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.load_all_translations, eq(false));
        assert_that!(settings.default_locale, none());
        assert_that!(
            settings.exclude_patterns,
            elements_are![eq("vendor/**"), eq("node_modules/**")]
        );
    }

    #[rstest]
    fn deserialize_wrapped_settings() {
        let json = r#"{"railsI18n": {"defaultLocale": "ja"}}"#;

        let settings: ServerSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.rails_i18n.default_locale, some(eq("ja")));
    }

    #[rstest]
    fn validate_invalid_key_separator_empty() {
        let settings =
            RailsI18nSettings { key_separator: String::new(), ..RailsI18nSettings::default() };
        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("keySeparator")),
                field!(ValidationError.message, contains_substring("cannot be empty"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_file_pattern_empty() {
        let settings = RailsI18nSettings {
            translation_files: TranslationFilesConfig { file_pattern: String::new() },
            ..RailsI18nSettings::default()
        };

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("translationFiles.filePattern")),
                field!(ValidationError.message, contains_substring("cannot be empty"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_file_pattern_invalid_glob() {
        let settings = RailsI18nSettings {
            translation_files: TranslationFilesConfig {
                file_pattern: "config/{locales/**/*.yml".to_string(),
            },
            ..RailsI18nSettings::default()
        };

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("translationFiles.filePattern")),
                field!(ValidationError.message, contains_substring("Invalid glob pattern"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_exclude_pattern_invalid_glob() {
        let settings = RailsI18nSettings {
            exclude_patterns: vec!["vendor/**".to_string(), "invalid[pattern".to_string()],
            ..RailsI18nSettings::default()
        };

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("excludePatterns[1]")),
                field!(ValidationError.message, contains_substring("Invalid glob pattern")),
                field!(ValidationError.message, contains_substring("invalid[pattern"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_default_locale_empty() {
        let settings = RailsI18nSettings {
            default_locale: Some(String::new()),
            ..RailsI18nSettings::default()
        };

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("defaultLocale")),
                field!(ValidationError.message, contains_substring("cannot be empty"))
            ]])
        );
    }

    #[rstest]
    fn config_error_validation_errors_format() {
        let settings = RailsI18nSettings {
            key_separator: String::new(),
            translation_files: TranslationFilesConfig { file_pattern: String::new() },
            ..RailsI18nSettings::default()
        };

        let validation_result = settings.validate();
        let errors = validation_result.unwrap_err();
        let config_error = ConfigError::ValidationErrors(errors);

        let error_message = format!("{config_error}");
        assert_that!(error_message, contains_substring("Configuration validation failed"));
        assert_that!(error_message, contains_substring("1. keySeparator"));
        assert_that!(error_message, contains_substring("2. translationFiles.filePattern"));
    }

    #[rstest]
    fn effective_threads_is_never_zero() {
        let config = IndexingConfig { num_threads: None };
        assert_that!(config.effective_threads(), ge(1));

        let explicit = IndexingConfig { num_threads: Some(4) };
        assert_that!(explicit.effective_threads(), eq(4));
    }
}
