//! Source file input definitions.

use std::path::Path;

/// An opened source file tracked by the server.
#[salsa::input]
pub struct SourceFile {
    /// File URI.
    #[returns(ref)]
    pub uri: String,

    /// Full text content.
    #[returns(ref)]
    pub text: String,

    /// Language inferred from the file extension.
    pub language: SourceLanguage,
}

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    /// Plain Ruby (`.rb`).
    Ruby,
}

impl SourceLanguage {
    /// Infers the source language from a file extension.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        let file_path = Path::new(uri);
        match file_path.extension().and_then(|ext| ext.to_str()) {
            Some("rb") => Some(Self::Ruby),
            _ => None,
        }
    }

    /// The tree-sitter grammar for this language.
    #[must_use]
    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        match self {
            Self::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        }
    }
}
