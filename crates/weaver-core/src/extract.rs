//! Best-effort extraction of a JSON object from free-form model text.
//!
//! Models wrap structured answers in prose or code fences often enough that
//! a strict parse alone is not useful. This is a defensive reader, not a
//! schema validator: callers still check the fields they need.

use serde_json::{Map, Value};

/// Outcome of [`extract_object`].
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// A JSON object was found.
    Parsed(Map<String, Value>),
    /// No parseable JSON object anywhere in the text.
    Unparsable,
}

/// Extract a JSON object from `text`.
///
/// 1. Try a strict parse of the whole (trimmed) text.
/// 2. Otherwise scan every top-level `{...}` object in the text and return
///    the last one that parses.
pub fn extract_object(text: &str) -> Extracted {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
        return Extracted::Parsed(map);
    }

    let mut last = None;
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find('{') {
        let start = cursor + offset;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => {
                // Skip past the whole object so nested objects are not
                // reported as separate candidates.
                cursor = start + stream.byte_offset();
                last = Some(map);
            }
            _ => cursor = start + 1,
        }
    }

    match last {
        Some(map) => Extracted::Parsed(map),
        None => Extracted::Unparsable,
    }
}
