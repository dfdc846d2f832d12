//! JSON version files.
//!
//! Rewrites go through `serde_json::Value` with key order preserved. The
//! original indentation, line endings, and trailing newline are detected
//! and reproduced so only the version line shows up in a diff.

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::{FormatResult, KeyPath};

/// Layout of a JSON file, captured before a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    /// `None` for single-line documents.
    indent: Option<String>,
    crlf: bool,
    trailing_newline: bool,
}

impl Layout {
    fn detect(contents: &str) -> Self {
        let crlf = contents.contains("\r\n");
        let trailing_newline = contents.ends_with('\n');

        let body = contents.trim_end();
        let indent = if body.contains('\n') {
            let found = body
                .lines()
                .skip(1)
                .map(|line| {
                    line.chars()
                        .take_while(|c| *c == ' ' || *c == '\t')
                        .collect::<String>()
                })
                .find(|ws| !ws.is_empty());
            Some(found.unwrap_or_else(|| "  ".to_string()))
        } else {
            None
        };

        Self {
            indent,
            crlf,
            trailing_newline,
        }
    }

    fn render(&self, value: &Value) -> FormatResult<String> {
        let mut out = match &self.indent {
            None => serde_json::to_string(value)?,
            Some(indent) => {
                let mut buf = Vec::new();
                let mut ser =
                    Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
                value.serialize(&mut ser)?;
                String::from_utf8_lossy(&buf).into_owned()
            }
        };

        if self.crlf {
            out = out.replace('\n', "\r\n");
        }
        if self.trailing_newline {
            out.push_str(if self.crlf { "\r\n" } else { "\n" });
        }
        Ok(out)
    }
}

fn lookup<'a>(value: &'a Value, key: &KeyPath) -> Option<&'a Value> {
    key.segments()
        .iter()
        .try_fold(value, |node, segment| node.as_object()?.get(segment))
}

fn lookup_mut<'a>(value: &'a mut Value, key: &KeyPath) -> Option<&'a mut Value> {
    key.segments()
        .iter()
        .try_fold(value, |node, segment| node.as_object_mut()?.get_mut(segment))
}

pub(super) fn extract(contents: &str, key: &KeyPath) -> FormatResult<Option<String>> {
    let value: Value = serde_json::from_str(contents)?;
    Ok(lookup(&value, key)
        .and_then(Value::as_str)
        .map(str::to_string))
}

pub(super) fn apply(contents: &str, key: &KeyPath, next: &str) -> FormatResult<String> {
    let mut value: Value = serde_json::from_str(contents)?;

    let Some(slot) = lookup_mut(&mut value, key) else {
        return Ok(contents.to_string());
    };
    // Non-string or already current: leave the bytes alone.
    if slot.as_str().is_none_or(|current| current == next) {
        return Ok(contents.to_string());
    }
    *slot = Value::String(next.to_string());

    Layout::detect(contents).render(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> KeyPath {
        KeyPath::default()
    }

    #[test]
    fn extract_top_level() {
        let got = extract(r#"{"name": "x", "version": "1.2.3"}"#, &key()).unwrap();
        assert_eq!(got.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn extract_nested_and_empty_segment() {
        let lock = r#"{"packages": {"": {"version": "4.0.0"}}}"#;
        let got = extract(lock, &KeyPath::parse("packages..version")).unwrap();
        assert_eq!(got.as_deref(), Some("4.0.0"));
    }

    #[test]
    fn extract_missing_or_non_string() {
        assert_eq!(extract(r#"{"name": "x"}"#, &key()).unwrap(), None);
        assert_eq!(extract(r#"{"version": 3}"#, &key()).unwrap(), None);
    }

    #[test]
    fn extract_invalid_json_errors() {
        assert!(extract("{not json", &key()).is_err());
    }

    #[test]
    fn apply_preserves_two_space_indent_and_order() {
        let before = "{\n  \"name\": \"x\",\n  \"version\": \"1.0.0\",\n  \"private\": true\n}\n";
        let after = apply(before, &key(), "1.1.0").unwrap();
        assert_eq!(
            after,
            "{\n  \"name\": \"x\",\n  \"version\": \"1.1.0\",\n  \"private\": true\n}\n"
        );
    }

    #[test]
    fn apply_preserves_four_space_indent_without_trailing_newline() {
        let before = "{\n    \"version\": \"1.0.0\"\n}";
        let after = apply(before, &key(), "2.0.0").unwrap();
        assert_eq!(after, "{\n    \"version\": \"2.0.0\"\n}");
    }

    #[test]
    fn apply_preserves_tabs_and_crlf() {
        let before = "{\r\n\t\"version\": \"1.0.0\"\r\n}\r\n";
        let after = apply(before, &key(), "1.0.1").unwrap();
        assert_eq!(after, "{\r\n\t\"version\": \"1.0.1\"\r\n}\r\n");
    }

    #[test]
    fn apply_keeps_single_line_documents_compact() {
        let after = apply(r#"{"version":"1.0.0","a":[1,2]}"#, &key(), "1.0.1").unwrap();
        assert_eq!(after, r#"{"version":"1.0.1","a":[1,2]}"#);
    }

    #[test]
    fn apply_missing_key_is_unchanged() {
        let before = "{\n  \"name\": \"x\"\n}\n";
        assert_eq!(apply(before, &key(), "1.0.0").unwrap(), before);
    }

    #[test]
    fn apply_nested_key() {
        let before = "{\n  \"packages\": {\n    \"\": {\n      \"version\": \"1.0.0\"\n    }\n  }\n}\n";
        let after = apply(before, &KeyPath::parse("packages..version"), "1.0.1").unwrap();
        assert!(after.contains("\"version\": \"1.0.1\""));
        assert_eq!(extract(&after, &KeyPath::parse("packages..version")).unwrap().as_deref(), Some("1.0.1"));
    }
}
