//! Extracts translation calls from Ruby source code using tree-sitter.

use thiserror::Error;
use tree_sitter::{
    Language,
    Node,
    Parser,
};

use crate::types::SourceRange;

/// Source analysis errors.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The tree-sitter grammar could not be loaded.
    #[error("failed to set up tree-sitter language: {0}")]
    LanguageSetup(#[from] tree_sitter::LanguageError),

    /// The source could not be parsed at all.
    #[error("failed to parse source")]
    ParseFailed,
}

/// One translation call found in source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationCall {
    /// The key literal, quotes stripped.
    pub key: String,
    /// Range of the key literal's content.
    pub key_range: SourceRange,
}

/// Finds `t("...")`, `translate("...")` and `I18n.t("...")` calls whose
/// first argument is a plain string literal.
///
/// Relative keys (leading `.`, resolved lazily against the view path) and
/// interpolated strings are skipped — only absolute literal keys resolve.
///
/// # Errors
/// Returns [`AnalyzerError`] if the grammar fails to load or the source
/// cannot be parsed.
pub fn analyze_translation_calls(
    source: &str,
    language: &Language,
) -> Result<Vec<TranslationCall>, AnalyzerError> {
    let mut parser = Parser::new();
    parser.set_language(language)?;
    let tree = parser.parse(source, None).ok_or(AnalyzerError::ParseFailed)?;

    let mut calls = Vec::new();
    walk(tree.root_node(), source.as_bytes(), &mut calls);
    Ok(calls)
}

/// Depth-first walk collecting translation calls.
fn walk(node: Node<'_>, source: &[u8], calls: &mut Vec<TranslationCall>) {
    if node.kind() == "call"
        && let Some(call) = translation_call(node, source)
    {
        calls.push(call);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, calls);
    }
}

/// Interprets a `call` node as a translation call, if it is one.
fn translation_call(node: Node<'_>, source: &[u8]) -> Option<TranslationCall> {
    let method = node.child_by_field_name("method")?;
    if method.kind() != "identifier" {
        return None;
    }
    let name = method.utf8_text(source).ok()?;
    if name != "t" && name != "translate" {
        return None;
    }

    // Bare `t`/`translate`, or explicitly on the I18n module.
    if let Some(receiver) = node.child_by_field_name("receiver") {
        if receiver.kind() != "constant" || receiver.utf8_text(source).ok()? != "I18n" {
            return None;
        }
    }

    let arguments = node.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let first = arguments.named_children(&mut cursor).next()?;
    if first.kind() != "string" {
        return None;
    }

    let (key, key_range) = literal_string_content(first, source)?;
    if key.starts_with('.') {
        // Lazy lookup key; resolution depends on the view path.
        return None;
    }
    Some(TranslationCall { key, key_range })
}

/// The content of a string literal, rejecting interpolation.
fn literal_string_content(string_node: Node<'_>, source: &[u8]) -> Option<(String, SourceRange)> {
    let mut cursor = string_node.walk();
    let parts: Vec<Node<'_>> = string_node.named_children(&mut cursor).collect();
    let [content] = parts.as_slice() else {
        return None;
    };
    if content.kind() != "string_content" {
        return None;
    }
    let text = content.utf8_text(source).ok()?;
    if text.is_empty() {
        return None;
    }
    Some((text.to_string(), SourceRange::from_node(content)))
}
