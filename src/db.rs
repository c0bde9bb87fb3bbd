//! Salsa データベース定義

/// i18n LSP のデータベーストレイト
#[salsa::db]
pub trait LocalesDatabase: salsa::Database {}

/// データベースの実装
#[salsa::db]
#[derive(Clone, Default)]
pub struct LocalesDatabaseImpl {
    /// Salsa のストレージ
    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl salsa::Database for LocalesDatabaseImpl {}

#[salsa::db]
impl LocalesDatabase for LocalesDatabaseImpl {}
