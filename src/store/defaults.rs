//! Default locale detection.
//!
//! Detection never fails past this module: every workspace unit always ends
//! up with some resolved default, falling back to [`FALLBACK_LOCALE`] when
//! nothing better is known.

/// Fixed default used when nothing can be detected. Matches the framework
/// convention (`config.i18n.default_locale` defaults to `en`).
pub const FALLBACK_LOCALE: &str = "en";

/// The resolved default locale for one workspace unit, together with how it
/// was decided. Recomputed as a whole per load cycle, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleDefaults {
    /// Resolved locale identifier (e.g. `en`).
    pub locale: String,
    /// How the locale was decided.
    pub method: DetectionMethod,
}

/// Outcome of the detection chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    /// Explicitly configured and present in the store.
    Configured,
    /// Matched the framework convention (`en`).
    Convention,
    /// Nothing matched; lexicographically smallest known locale, or the
    /// fixed constant when the store knows no locales at all.
    Fallback,
}

/// Resolves the default locale for one unit.
///
/// Attempted in order, first success wins:
/// 1. `configured`, if the store actually has that locale
/// 2. the convention default (`en`), if present
/// 3. the lexicographically smallest known locale
/// 4. the fixed constant default
#[must_use]
pub fn detect(configured: Option<&str>, known_locales: &[String]) -> LocaleDefaults {
    if let Some(locale) = configured
        && known_locales.iter().any(|known| known == locale)
    {
        return LocaleDefaults { locale: locale.to_string(), method: DetectionMethod::Configured };
    }

    if known_locales.iter().any(|known| known == FALLBACK_LOCALE) {
        return LocaleDefaults {
            locale: FALLBACK_LOCALE.to_string(),
            method: DetectionMethod::Convention,
        };
    }

    if let Some(smallest) = known_locales.iter().min() {
        tracing::debug!(locale = %smallest, "Default locale fell back to smallest known locale");
        return LocaleDefaults { locale: smallest.clone(), method: DetectionMethod::Fallback };
    }

    tracing::warn!("Default locale detection failed; using the fixed constant default");
    LocaleDefaults { locale: FALLBACK_LOCALE.to_string(), method: DetectionMethod::Fallback }
}
