//! Best-effort extraction of a JSON object from a model reply.
//!
//! Replies are expected to be bare JSON or JSON inside a fenced code block. Prose around
//! an unfenced object, or an untagged fence holding something else, is a parse failure.

use serde::de::DeserializeOwned;
use serde_json::Value;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("model reply is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model reply is JSON but not an object")]
    NotAnObject,
    #[error("model reply does not match the expected schema: {0}")]
    Schema(String),
}

/// Content of the first ```json block, else of the first ``` block, else the whole text.
/// An unterminated fence runs to the end of the text.
fn fenced_body(text: &str) -> &str {
    let (marker, start) = match text.find(JSON_FENCE) {
        Some(i) => (JSON_FENCE, i),
        None => match text.find(FENCE) {
            Some(i) => (FENCE, i),
            None => return text,
        },
    };
    let rest = &text[start + marker.len()..];
    match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// Parse the JSON object carried by `text`, stripping an optional fenced block first.
/// Text that already parses as an object is taken as-is, even if a string in it holds a fence.
pub fn extract_json(text: &str) -> Result<Value, CodecError> {
    let text = text.trim();
    if text.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return object(value);
        }
    }
    let body = fenced_body(text).trim();
    object(serde_json::from_str(body)?)
}

fn object(value: Value) -> Result<Value, CodecError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(CodecError::NotAnObject)
    }
}

/// Extract the JSON object and decode it into a typed record.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    Ok(decode_with_raw(text)?.record)
}

/// A typed view of a model reply alongside the object it was read from.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub record: T,
    pub raw: Value,
}

/// Like [`decode`], but keeps the extracted object untouched so callers can pass it on
/// verbatim (integer quantities and extra fields included).
pub fn decode_with_raw<T: DeserializeOwned>(text: &str) -> Result<Decoded<T>, CodecError> {
    let raw = extract_json(text)?;
    let record =
        serde_json::from_value(raw.clone()).map_err(|e| CodecError::Schema(e.to_string()))?;
    Ok(Decoded { record, raw })
}
