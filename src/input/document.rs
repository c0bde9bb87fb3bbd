//! Locale document input definitions.
//!
//! A locale document is one YAML file under `config/locales/` whose single
//! top-level key names the locale (e.g. `en:`). Parsing produces a flattened
//! dotted-key map plus per-leaf source ranges for go-to-definition.

use std::collections::HashMap;

use serde_yaml::Value;
use thiserror::Error;

use crate::types::SourceRange;

/// Errors raised while reading or parsing a locale document.
///
/// All variants are contained at the document-processing boundary: a bad
/// document is logged and skipped, never aborting the load of its unit.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document is not valid YAML.
    #[error("failed to parse locale document: {0}")]
    Malformed(#[from] serde_yaml::Error),

    /// The document does not have exactly one top-level locale key.
    #[error("locale document must have a single top-level locale key (found {0})")]
    Shape(usize),

    /// The document could not be read from disk.
    #[error("failed to read locale document: {0}")]
    Unreadable(#[from] std::io::Error),
}

/// Result of parsing one locale document's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Locale identifier taken from the top-level key.
    pub locale: String,
    /// Flattened dotted-key map, locale prefix stripped
    /// (e.g. `users.show.title` -> `Title`).
    pub entries: HashMap<String, String>,
    /// Key source ranges, keyed like `entries`.
    pub key_ranges: HashMap<String, SourceRange>,
    /// Leaf value source ranges, keyed like `entries`.
    pub value_ranges: HashMap<String, SourceRange>,
}

/// Salsa input representing one loaded locale document.
///
/// A reload creates a fresh input that supersedes the previous one; inputs
/// are never mutated in place.
#[salsa::input]
pub struct LocaleDocument {
    /// Locale identifier.
    #[returns(ref)]
    pub locale: String,

    /// Absolute path of the source file.
    #[returns(ref)]
    pub file_path: String,

    /// Flattened key map (e.g. `users.show.title` -> `Title`).
    #[returns(ref)]
    pub entries: HashMap<String, String>,

    /// Key to source range mapping for go-to-definition.
    #[returns(ref)]
    pub key_ranges: HashMap<String, SourceRange>,

    /// Value to source range mapping.
    #[returns(ref)]
    pub value_ranges: HashMap<String, SourceRange>,
}

/// Parses a locale document's text.
///
/// # Errors
/// - [`DocumentError::Malformed`] if the text is not valid YAML
/// - [`DocumentError::Shape`] if there is not exactly one top-level key
pub fn parse_document(text: &str, separator: &str) -> Result<ParsedDocument, DocumentError> {
    let value: Value = serde_yaml::from_str(text)?;

    let Value::Mapping(root) = &value else {
        return Err(DocumentError::Shape(0));
    };
    if root.len() != 1 {
        return Err(DocumentError::Shape(root.len()));
    }
    let Some((locale_key, body)) = root.iter().next() else {
        return Err(DocumentError::Shape(0));
    };
    let Some(locale) = mapping_key_text(locale_key) else {
        return Err(DocumentError::Shape(root.len()));
    };

    let entries = flatten_yaml(body, separator, None);

    // Ranges are extracted for full paths (locale included) and then re-keyed
    // to match `entries`.
    let (key_ranges, value_ranges) = extract_key_value_ranges(text, separator);
    let prefix = format!("{locale}{separator}");
    let key_ranges = strip_locale_prefix(key_ranges, &prefix);
    let value_ranges = strip_locale_prefix(value_ranges, &prefix);

    Ok(ParsedDocument { locale, entries, key_ranges, value_ranges })
}

/// Parses `text` and records it as a [`LocaleDocument`] input.
///
/// # Errors
/// Same as [`parse_document`].
pub fn create_document(
    db: &dyn crate::db::LocalesDatabase,
    file_path: &std::path::Path,
    text: &str,
    separator: &str,
) -> Result<LocaleDocument, DocumentError> {
    let parsed = parse_document(text, separator)?;
    Ok(LocaleDocument::new(
        db,
        parsed.locale,
        file_path.to_string_lossy().to_string(),
        parsed.entries,
        parsed.key_ranges,
        parsed.value_ranges,
    ))
}

/// Flatten a nested YAML value into a dot-separated key map.
///
/// Null values are skipped: in a locale file a null marks a missing
/// translation, not an empty one.
///
/// # Examples
/// ```
/// use rails_i18n_language_server::input::document::flatten_yaml;
///
/// let value: serde_yaml::Value = serde_yaml::from_str("greeting:\n  hi: Hi\n").unwrap();
/// let flattened = flatten_yaml(&value, ".", None);
/// assert_eq!(flattened.get("greeting.hi"), Some(&"Hi".to_string()));
/// ```
#[must_use]
pub fn flatten_yaml(
    value: &Value,
    separator: &str,
    prefix: Option<&str>,
) -> HashMap<String, String> {
    let mut result = HashMap::new();
    flatten_yaml_value(value, separator, prefix, &mut result);
    result
}

/// Recursive worker behind [`flatten_yaml`].
fn flatten_yaml_value(
    value: &Value,
    separator: &str,
    prefix: Option<&str>,
    result: &mut HashMap<String, String>,
) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let Some(key_text) = mapping_key_text(key) else {
                    tracing::warn!(?key, "Skipping non-scalar mapping key");
                    continue;
                };
                let full_key =
                    prefix.map_or_else(|| key_text.clone(), |p| format!("{p}{separator}{key_text}"));
                flatten_yaml_value(child, separator, Some(&full_key), result);
            }
        }
        Value::Sequence(seq) => {
            for (index, child) in seq.iter().enumerate() {
                let full_key =
                    prefix.map_or_else(|| format!("[{index}]"), |p| format!("{p}[{index}]"));
                flatten_yaml_value(child, separator, Some(&full_key), result);
            }
        }
        Value::String(s) => {
            if let Some(key) = prefix {
                result.insert(key.to_string(), s.clone());
            }
        }
        Value::Bool(b) => {
            if let Some(key) = prefix {
                result.insert(key.to_string(), b.to_string());
            }
        }
        Value::Number(n) => {
            if let Some(key) = prefix {
                result.insert(key.to_string(), n.to_string());
            }
        }
        Value::Tagged(tagged) => {
            flatten_yaml_value(&tagged.value, separator, prefix, result);
        }
        Value::Null => {}
    }
}

/// Renders a mapping key as text. Locale files occasionally use numeric or
/// boolean keys (pluralization tables); anything else is rejected.
fn mapping_key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Re-keys a range map from full paths (`en.users.title`) to entry paths
/// (`users.title`). Ranges outside the locale root (the locale key itself)
/// are dropped.
fn strip_locale_prefix(
    ranges: HashMap<String, SourceRange>,
    prefix: &str,
) -> HashMap<String, SourceRange> {
    ranges
        .into_iter()
        .filter_map(|(key, range)| key.strip_prefix(prefix).map(|rest| (rest.to_string(), range)))
        .collect()
}

/// Extract key and value source ranges from YAML text using tree-sitter.
#[must_use]
pub fn extract_key_value_ranges(
    yaml_text: &str,
    separator: &str,
) -> (HashMap<String, SourceRange>, HashMap<String, SourceRange>) {
    let mut key_ranges = HashMap::new();
    let mut value_ranges = HashMap::new();

    let mut parser = tree_sitter::Parser::new();
    let Ok(()) = parser.set_language(&tree_sitter_yaml::LANGUAGE.into()) else {
        tracing::warn!("Failed to set tree-sitter-yaml language");
        return (key_ranges, value_ranges);
    };

    let Some(tree) = parser.parse(yaml_text, None) else {
        tracing::warn!("Failed to parse YAML with tree-sitter");
        return (key_ranges, value_ranges);
    };

    collect_ranges(
        tree.root_node(),
        yaml_text.as_bytes(),
        separator,
        None,
        &mut key_ranges,
        &mut value_ranges,
    );

    (key_ranges, value_ranges)
}

/// Walks the YAML syntax tree accumulating ranges per dotted key path.
fn collect_ranges(
    node: tree_sitter::Node<'_>,
    source: &[u8],
    separator: &str,
    prefix: Option<&str>,
    key_ranges: &mut HashMap<String, SourceRange>,
    value_ranges: &mut HashMap<String, SourceRange>,
) {
    match node.kind() {
        "block_mapping_pair" | "flow_pair" => {
            collect_pair(node, source, separator, prefix, key_ranges, value_ranges);
        }
        "block_sequence" | "flow_sequence" => {
            collect_sequence(node, source, separator, prefix, key_ranges, value_ranges);
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_ranges(child, source, separator, prefix, key_ranges, value_ranges);
            }
        }
    }
}

/// Records one mapping pair and recurses into nested structures.
fn collect_pair(
    node: tree_sitter::Node<'_>,
    source: &[u8],
    separator: &str,
    prefix: Option<&str>,
    key_ranges: &mut HashMap<String, SourceRange>,
    value_ranges: &mut HashMap<String, SourceRange>,
) {
    let Some(key_node) = node.child_by_field_name("key") else {
        return;
    };
    let Some(key_text) = scalar_text(key_node, source) else {
        return;
    };

    let full_key = prefix.map_or_else(|| key_text.clone(), |p| format!("{p}{separator}{key_text}"));
    key_ranges.insert(full_key.clone(), SourceRange::from_node(&key_node));

    let Some(value_node) = node.child_by_field_name("value") else {
        return;
    };

    if has_nested_structure(value_node) {
        collect_ranges(value_node, source, separator, Some(&full_key), key_ranges, value_ranges);
    } else {
        value_ranges.insert(full_key, SourceRange::from_node(&value_node));
    }
}

/// Records sequence elements with `[index]` path segments.
fn collect_sequence(
    node: tree_sitter::Node<'_>,
    source: &[u8],
    separator: &str,
    prefix: Option<&str>,
    key_ranges: &mut HashMap<String, SourceRange>,
    value_ranges: &mut HashMap<String, SourceRange>,
) {
    let mut index = 0_usize;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let item = match child.kind() {
            // Block items wrap their payload behind the `-` marker.
            "block_sequence_item" => {
                let mut item_cursor = child.walk();
                child.named_children(&mut item_cursor).next()
            }
            "flow_node" => Some(child),
            _ => None,
        };
        let Some(item) = item else {
            continue;
        };

        let full_key = prefix.map_or_else(|| format!("[{index}]"), |p| format!("{p}[{index}]"));
        key_ranges.insert(full_key.clone(), SourceRange::from_node(&item));

        if has_nested_structure(item) {
            collect_ranges(item, source, separator, Some(&full_key), key_ranges, value_ranges);
        } else {
            value_ranges.insert(full_key, SourceRange::from_node(&item));
        }

        index += 1;
    }
}

/// Whether a value node contains a mapping or sequence (as opposed to a
/// scalar leaf), looking through `block_node`/`flow_node` wrappers.
fn has_nested_structure(node: tree_sitter::Node<'_>) -> bool {
    match node.kind() {
        "block_mapping" | "flow_mapping" | "block_sequence" | "flow_sequence" => true,
        "block_node" | "flow_node" | "document" => {
            let mut cursor = node.walk();
            node.children(&mut cursor).any(has_nested_structure)
        }
        _ => false,
    }
}

/// Scalar text of a key node, quotes stripped.
fn scalar_text(node: tree_sitter::Node<'_>, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    let trimmed = text.trim().trim_matches('"').trim_matches('\'');
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}
