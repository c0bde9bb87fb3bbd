//! Ruby ソース解析

mod extractor;

pub use extractor::{
    AnalyzerError,
    TranslationCall,
    analyze_translation_calls,
};

use crate::db::LocalesDatabase;
use crate::input::source::SourceFile;
use crate::interned::I18nKey;
use crate::ir::key_usage::KeyUsage;
use crate::types::SourcePosition;

/// ソースファイルを解析してキー使用箇所を抽出
#[salsa::tracked]
pub fn analyze_source(db: &dyn LocalesDatabase, file: SourceFile) -> Vec<KeyUsage<'_>> {
    let text = file.text(db);
    let language = file.language(db).tree_sitter_language();

    let calls = extractor::analyze_translation_calls(text, &language).unwrap_or_default();

    calls
        .into_iter()
        .map(|call| {
            let key = I18nKey::new(db, call.key);
            KeyUsage::new(db, key, call.key_range)
        })
        .collect()
}

/// 特定位置にあるキーを取得（Salsa クエリ）
#[salsa::tracked]
pub fn key_at_position(
    db: &dyn LocalesDatabase,
    file: SourceFile,
    position: SourcePosition,
) -> Option<I18nKey<'_>> {
    let usages = analyze_source(db, file);

    for usage in usages {
        if usage.range(db).contains(position) {
            return Some(usage.key(db));
        }
    }

    None
}
