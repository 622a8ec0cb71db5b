//! Key Builder: deterministic cache-key composition and namespace normalization.

use std::collections::HashMap;

/// Output rendering format, derived from a namespace's file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Java-properties-style `key=value` lines (the default).
    Properties,
    Json,
    Yaml,
    Xml,
}

impl Format {
    /// Lowercases the namespace and matches it against known suffixes,
    /// defaulting to `Properties` when no suffix is recognized.
    pub fn determine(namespace: &str) -> Self {
        let lower = namespace.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Format::Json
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Format::Yaml
        } else if lower.ends_with(".xml") {
            Format::Xml
        } else {
            Format::Properties
        }
    }

    /// The string token used inside cache keys and in `Content-Type` selection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Properties => "properties",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Xml => "xml",
        }
    }
}

const CACHE_KEY_DELIMITER: char = '+';

/// Strips a trailing `.properties` suffix, then resolves the canonical
/// spelling for this `appId` via `known_namespaces` (a case-insensitive
/// lookup table); falls back to the stripped input when the namespace is
/// not found in the table.
pub fn normalize_namespace(
    app_id: &str,
    raw_namespace: &str,
    known_namespaces: &HashMap<String, Vec<String>>,
) -> String {
    let stripped = raw_namespace
        .strip_suffix(".properties")
        .unwrap_or(raw_namespace);

    if let Some(namespaces) = known_namespaces.get(app_id) {
        for candidate in namespaces {
            if candidate.eq_ignore_ascii_case(stripped) {
                return candidate.clone();
            }
        }
    }

    stripped.to_string()
}

/// Joins the cache-key components with [`CACHE_KEY_DELIMITER`], omitting the
/// data-center segment when blank.
pub fn build_cache_key(
    format: Format,
    app_id: &str,
    cluster_name: &str,
    namespace: &str,
    data_center: &str,
) -> String {
    let mut key = format!(
        "{}{d}{}{d}{}{d}{}",
        format.as_str(),
        app_id,
        cluster_name,
        namespace,
        d = CACHE_KEY_DELIMITER
    );
    if !data_center.trim().is_empty() {
        key.push(CACHE_KEY_DELIMITER);
        key.push_str(data_center.trim());
    }
    key
}
