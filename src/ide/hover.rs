//! Hover implementation

use std::fmt::Write as _;
use std::path::Path;

use crate::store::TranslationStore;

/// 表示する値を切り詰める最大長
const MAX_VALUE_LENGTH: usize = 80;

/// Generate hover content for a translation key.
///
/// Shows the key's value per locale within the owning workspace unit.
///
/// # ソート順
/// ロケールは以下の順序でソートされます：
/// 1. そのユニットのデフォルトロケール
/// 2. その他（アルファベット順）
#[must_use]
pub fn generate_hover_content(
    store: &TranslationStore,
    unit: &Path,
    key_text: &str,
) -> Option<String> {
    let mut locales = store.locales(unit);
    if let Some(default) = store.defaults(unit).map(|d| d.locale.clone()) {
        // locales() is sorted; move the default to the front.
        if let Some(position) = locales.iter().position(|l| *l == default) {
            locales.remove(position);
            locales.insert(0, default);
        }
    }

    let mut found = Vec::new();
    for locale in locales {
        if let Some(value) = store.get_translation(key_text, &locale, unit) {
            found.push((locale, truncate_string(value, MAX_VALUE_LENGTH)));
        }
    }

    if found.is_empty() {
        return None;
    }

    let mut content = format!("**Translation Key:** `{key_text}`\n\n");
    for (locale, value) in found {
        let _ = writeln!(content, "**{locale}**: {value}");
    }
    Some(content)
}

/// 文字列を指定した長さに切り詰める
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
