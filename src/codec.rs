//! Format Codec: renders a resolved configuration as properties, JSON, or raw.

use crate::key::Format;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while rendering a configuration payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A raw (non-properties) namespace was requested but the resolved
    /// configuration carried no `content` entry.
    #[error("raw namespace missing 'content' key")]
    MissingContent,
}

/// Renders a key/value map using Java-`.properties` escaping conventions.
/// Entries are emitted in sorted-key order, which is deterministic for a
/// given map without depending on insertion order.
pub fn render_properties(configurations: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in configurations {
        out.push_str(&escape_properties(key, true));
        out.push('=');
        out.push_str(&escape_properties(value, false));
        out.push('\n');
    }
    out
}

// Keys use whitespace as an alternate key/value delimiter in the
// `.properties` format, so every space in a key must be escaped, not just
// a leading one; values only need their leading whitespace protected from
// trimming.
fn escape_properties(input: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_start = true;
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '=' => out.push_str("\\="),
            ':' => out.push_str("\\:"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' ' if is_key || at_start => out.push_str("\\ "),
            other => out.push(other),
        }
        if ch != ' ' {
            at_start = false;
        }
    }
    out
}

/// Renders a key/value map as a flat JSON object of string members.
pub fn render_json(configurations: &BTreeMap<String, String>) -> Result<String, CodecError> {
    serde_json::to_string(configurations).map_err(|_| CodecError::MissingContent)
}

/// Renders the raw, native-format document for a non-properties namespace.
/// For properties namespaces this is identical to [`render_properties`];
/// otherwise the already-formatted document is taken verbatim from the
/// reserved `content` key.
pub fn render_raw(
    format: Format,
    configurations: &BTreeMap<String, String>,
) -> Result<String, CodecError> {
    match format {
        Format::Properties => Ok(render_properties(configurations)),
        _ => configurations
            .get("content")
            .cloned()
            .ok_or(CodecError::MissingContent),
    }
}

/// `Content-Type` header value for a successful raw-format response.
pub fn raw_content_type(format: Format) -> &'static str {
    match format {
        Format::Properties => "text/plain;charset=UTF-8",
        Format::Json => "application/json;charset=UTF-8",
        Format::Yaml => "application/yaml;charset=UTF-8",
        Format::Xml => "application/xml;charset=UTF-8",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn properties_renders_key_value_lines() {
        let m = map(&[("k", "v")]);
        assert_eq!(render_properties(&m), "k=v\n");
    }

    #[test]
    fn properties_escapes_special_characters() {
        let m = map(&[("a b", "x=y:z\\w")]);
        let rendered = render_properties(&m);
        assert_eq!(rendered, "a\\ b=x\\=y\\:z\\\\w\n");
    }

    #[test]
    fn json_renders_flat_object() {
        let m = map(&[("a", "1"), ("b", "2")]);
        let rendered = render_json(&m).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["a"], "1");
        assert_eq!(parsed["b"], "2");
    }

    #[test]
    fn raw_yaml_reads_content_key() {
        let m = map(&[("content", "foo: bar\n")]);
        let rendered = render_raw(Format::Yaml, &m).unwrap();
        assert_eq!(rendered, "foo: bar\n");
    }

    #[test]
    fn raw_yaml_without_content_is_an_error() {
        let m = map(&[("foo", "bar")]);
        assert!(matches!(
            render_raw(Format::Yaml, &m),
            Err(CodecError::MissingContent)
        ));
    }

    #[test]
    fn raw_properties_delegates_to_properties_rendering() {
        let m = map(&[("k", "v")]);
        assert_eq!(render_raw(Format::Properties, &m).unwrap(), "k=v\n");
    }
}
