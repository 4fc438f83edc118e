//! Decoding of JSON payloads embedded in LLM responses.
//!
//! Models tend to wrap structured output in a markdown fence:
//!
//! ````text
//! Here is the analysis:
//! ```json
//! {"tasks": []}
//! ```
//! ````
//!
//! [`normalize`] pulls such payloads out and decodes them, recursing into every
//! nested value so that a string field holding fenced JSON is decoded as well.
//! Decoding never fails; text that is not JSON is kept as text.

use serde_json::Value;

const FENCE_OPEN: &str = "```json";
const FENCE: &str = "```";

/// Find the interior of the first ```` ```json ```` fenced block.
///
/// Whitespace after the opening tag and before the closing fence is not part
/// of the interior. Returns `None` if there is no opening tag or it is never
/// closed.
pub fn extract_fenced_json(text: &str) -> Option<&str> {
    let start = text.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let rest = text[start..].trim_start();
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim_end())
}

/// Decode one piece of text.
///
/// A fenced block wins over direct parsing. When the fenced interior is not
/// valid JSON the interior text itself is returned, not the full input.
pub fn parse_json_from_markdown(text: &str) -> Value {
    if let Some(inner) = extract_fenced_json(text) {
        return serde_json::from_str(inner).unwrap_or_else(|_| Value::String(inner.to_string()));
    }

    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Recursively decode every string in `value` that carries JSON.
///
/// A string that decodes to another string is decoded again, so JSON encoded
/// more than once is fully unwrapped. Objects keep their keys and key order,
/// arrays keep their order, and numbers, booleans and null pass through
/// untouched.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, normalize(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::String(text) => match parse_json_from_markdown(&text) {
            decoded @ (Value::Object(_) | Value::Array(_)) => normalize(decoded),
            // Each decode strictly shortens the text, so this terminates
            Value::String(decoded) if decoded != text => normalize(Value::String(decoded)),
            other => other,
        },
        other => other,
    }
}

/// Normalize a raw task response
pub fn normalize_raw(raw: &str) -> Value {
    normalize(Value::String(raw.to_string()))
}

/// Whether a normalized value carries structured data rather than plain text
pub fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
