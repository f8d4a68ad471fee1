//! JSON text ⇄ [`Value`] and the text-level merge entry point.
//!
//! Parsing and printing go through `serde_json` (built with `preserve_order`
//! and `arbitrary_precision`), so object key order and the exact spelling of
//! numbers survive a parse → merge → serialize cycle.
//!
//! Existing settings files are often hand-edited, so the original side of
//! [`merge_documents`] tolerates trailing commas. Incoming content is produced
//! by tooling and is parsed strictly.

use std::borrow::Cow;

use tracing::debug;

use crate::error::Result;
use crate::merge::try_merge;
use crate::value::Value;

/// Parse strict JSON into a document tree.
///
/// # Errors
///
/// Returns [`crate::SettingsError::Parse`] on malformed input.
pub fn parse(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}

/// Parse JSON that may contain trailing commas before `}` or `]`.
///
/// # Errors
///
/// Returns [`crate::SettingsError::Parse`] if the text is malformed for any
/// other reason.
pub fn parse_lenient(text: &str) -> Result<Value> {
    parse(&strip_trailing_commas(text))
}

/// Serialize a document as two-space indented JSON.
pub fn serialize(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Serialize a document as single-line JSON.
pub fn serialize_compact(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Merge `incoming` JSON text into `original` JSON text.
///
/// If the two roots are different container kinds, `original` is returned
/// exactly as given. Otherwise the merged tree is serialized with
/// [`serialize`].
///
/// # Errors
///
/// Returns [`crate::SettingsError::Parse`] if either text is malformed, or
/// [`crate::SettingsError::RootType`] if the original root is a scalar.
///
/// # Example
/// ```
/// use settings_merge::merge_documents;
///
/// let merged = merge_documents(r#"{"a": [1, 2],}"#, r#"{"a": [3]}"#).unwrap();
/// assert_eq!(merged, "{\n  \"a\": [\n    1,\n    2,\n    3\n  ]\n}");
/// ```
pub fn merge_documents(original: &str, incoming: &str) -> Result<String> {
    let original_value = parse_lenient(original)?;
    let incoming_value = parse(incoming)?;

    match try_merge(&original_value, &incoming_value)? {
        Some(merged) => serialize(&merged),
        None => {
            debug!("returning original document text unchanged");
            Ok(original.to_owned())
        }
    }
}

/// Remove commas that are directly followed (ignoring whitespace) by a closing
/// `}` or `]` and preceded by an element. String literals are copied through
/// untouched. A comma with nothing before it (`[,]`, `{,}`, `[1,,]`) is kept
/// so the parser still rejects it.
fn strip_trailing_commas(text: &str) -> Cow<'_, str> {
    if !text.contains(',') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut stripped = false;
    // Last non-whitespace character outside a string; `"` for a closed string.
    let mut last: Option<char> = None;
    for (i, c) in text.char_indices() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let rest = text[i + 1..].trim_start();
                let closes = rest.starts_with('}') || rest.starts_with(']');
                let follows_element = !matches!(last, None | Some('[' | '{' | ','));
                if closes && follows_element {
                    stripped = true;
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
        if !c.is_whitespace() {
            last = Some(c);
        }
    }

    if stripped {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_trailing_commas() {
        assert_eq!(strip_trailing_commas(r#"{"a":1,}"#), r#"{"a":1}"#);
        assert_eq!(strip_trailing_commas("[1,2,\n  ]"), "[1,2\n  ]");
        assert_eq!(strip_trailing_commas(r#"{"a":[1,],"b":2}"#), r#"{"a":[1],"b":2}"#);
    }

    #[test]
    fn leaves_commas_inside_strings() {
        let text = r#"{"a":"x,}","b":"y\",]"}"#;
        assert!(matches!(strip_trailing_commas(text), Cow::Borrowed(_)));
    }

    #[test]
    fn borrowed_when_nothing_to_strip() {
        assert!(matches!(strip_trailing_commas(r#"{"a":1,"b":2}"#), Cow::Borrowed(_)));
        assert!(matches!(strip_trailing_commas("{}"), Cow::Borrowed(_)));
    }

    #[test]
    fn keeps_commas_without_a_preceding_element() {
        for text in ["[,]", "{,}", "[ , ]", "[1,,]", r#"{"a":1,,}"#] {
            assert!(matches!(strip_trailing_commas(text), Cow::Borrowed(_)), "{text}");
        }
        assert_eq!(strip_trailing_commas(r#"["x",]"#), r#"["x"]"#);
        assert_eq!(strip_trailing_commas("[[],{},]"), "[[],{}]");
    }
}
