//! Variable substitution engine for `<<name>>` placeholders

use std::collections::HashMap;

const OPEN: &str = "<<";
const CLOSE: &str = ">>";

/// Substitute `<<name>>` placeholders in `text` with values from `variables`.
///
/// Unknown names are left in place, delimiters included. Substituted values
/// are never scanned again, so a value containing `<<x>>` comes out verbatim.
pub fn substitute(text: &str, variables: &HashMap<String, String>) -> String {
    if variables.is_empty() || !text.contains(OPEN) {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(OPEN) {
        let after_open = &rest[open + OPEN.len()..];
        let Some(close) = after_open.find(CLOSE) else {
            break;
        };

        // "<<a <<b>>" and "<<<b>>" bind the last opener before the closer
        let close_at = open + OPEN.len() + close;
        let start = rest[..close_at].rfind(OPEN).unwrap_or(open);
        let name = &rest[start + OPEN.len()..close_at];
        let span_end = close_at + CLOSE.len();

        result.push_str(&rest[..start]);
        match variables.get(name) {
            Some(value) => result.push_str(value),
            None => result.push_str(&rest[start..span_end]),
        }

        rest = &rest[span_end..];
    }

    result.push_str(rest);
    result
}

/// Render a JSON scalar the way it should appear inside a notification string.
pub fn stringify_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        // For arrays and objects, use JSON representation
        _ => value.to_string(),
    }
}
