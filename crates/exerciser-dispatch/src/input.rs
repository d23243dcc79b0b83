//! Parsing the editable texts: the input document and the bindings

use exerciser_core::{Binding, Bindings, InputError};
use serde_json::Value;

/// Bindings text offered when a session has none
pub const DEFAULT_BINDINGS_TEXT: &str = "{\n  // name: value\n}";

/// Parse the input document
///
/// An empty (or whitespace-only) document is absent, not an error.
pub fn parse_input(text: &str) -> Result<Option<Value>, InputError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|err| input_error(text, &err))
}

/// Reformat the input document with 2-space indentation, keeping key order
pub fn format_document(text: &str) -> Result<String, InputError> {
    let value: Value = serde_json::from_str(text).map_err(|err| input_error(text, &err))?;
    serde_json::to_string_pretty(&value).map_err(|err| InputError {
        message: err.to_string(),
        offset: None,
    })
}

/// Parse the bindings text into value bindings
///
/// The text is a JSON object; lines whose first non-blank characters are `//`
/// are comments.
pub fn parse_bindings(text: &str) -> Result<Bindings, InputError> {
    let stripped = strip_line_comments(text);
    if stripped.trim().is_empty() {
        return Ok(Bindings::new());
    }
    let value: Value = serde_json::from_str(&stripped).map_err(|err| input_error(&stripped, &err))?;
    match value {
        Value::Object(map) => Ok(map.into_iter().map(|(name, value)| (name, Binding::Value(value))).collect()),
        other => Err(InputError {
            message: format!("bindings must be an object, got {}", type_name(&other)),
            offset: None,
        }),
    }
}

/// Blank out comment lines, keeping every other character where it was
fn strip_line_comments(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            if line.trim_start().starts_with("//") {
                let body = line.trim_end_matches(&['\r', '\n'][..]);
                let mut blanked = " ".repeat(body.chars().count());
                blanked.push_str(&line[body.len()..]);
                blanked
            } else {
                line.to_string()
            }
        })
        .collect()
}

fn input_error(text: &str, err: &serde_json::Error) -> InputError {
    InputError {
        message: err.to_string(),
        offset: char_offset(text, err.line(), err.column()),
    }
}

/// Zero-based character offset of a 1-based line and byte column
fn char_offset(text: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let line_start: usize = text.split_inclusive('\n').take(line - 1).map(str::len).sum();
    let mut byte = (line_start + column.saturating_sub(1)).min(text.len());
    while !text.is_char_boundary(byte) {
        byte -= 1;
    }
    Some(text[..byte].chars().count())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_document_is_absent() {
        assert_eq!(parse_input("").unwrap(), None);
        assert_eq!(parse_input("  \n").unwrap(), None);
    }

    #[test]
    fn test_document_parsed() {
        assert_eq!(parse_input(r#"{"a": [1, 2]}"#).unwrap(), Some(json!({"a": [1, 2]})));
        assert_eq!(parse_input("null").unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_malformed_token_offset() {
        let err = parse_input(r#"{"a":}"#).unwrap_err();
        assert_eq!(err.offset, Some(5));
        assert!(err.message.contains("line 1 column 6"));
    }

    #[test]
    fn test_offset_on_later_line() {
        let err = parse_input("{\n  \"a\": 1,\n  \"b\": ]\n}").unwrap_err();
        // the `]` on the third line
        assert_eq!(err.offset, Some(19));
    }

    #[test]
    fn test_offset_counts_characters() {
        let err = parse_input("{\"é\": x}").unwrap_err();
        assert_eq!(err.offset, Some(6));
    }

    #[test]
    fn test_format_document() {
        assert_eq!(
            format_document(r#"{"b":1,"a":[true,{"c":null}]}"#).unwrap(),
            "{\n  \"b\": 1,\n  \"a\": [\n    true,\n    {\n      \"c\": null\n    }\n  ]\n}"
        );
        assert!(format_document("[1,").unwrap_err().offset.is_some());
    }

    #[test]
    fn test_default_bindings_text_is_empty() {
        assert!(parse_bindings(DEFAULT_BINDINGS_TEXT).unwrap().is_empty());
        assert!(parse_bindings("").unwrap().is_empty());
    }

    #[test]
    fn test_bindings_with_comments() {
        let bindings = parse_bindings("{\n  // rate\n  \"rate\": 0.2,\n  \"names\": [\"x\"]\n}").unwrap();
        assert_eq!(bindings.len(), 2);
        assert!(matches!(&bindings["rate"], Binding::Value(v) if *v == json!(0.2)));
    }

    #[test]
    fn test_bindings_must_be_object() {
        let err = parse_bindings("[1, 2]").unwrap_err();
        assert_eq!(err.message, "bindings must be an object, got an array");
        assert_eq!(err.offset, None);
    }

    #[test]
    fn test_bindings_error_offset_survives_comments() {
        let err = parse_bindings("// header\n{\"a\": }").unwrap_err();
        assert_eq!(err.offset, Some(16));
    }
}
