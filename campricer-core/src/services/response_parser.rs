//! Recognition response parsing
//!
//! The service relays model output close to verbatim, so the JSON document
//! we need may arrive bare, wrapped in a markdown code fence, double-encoded
//! as a JSON string, or buried in surrounding prose. Extraction runs an
//! ordered list of independent strategies and the first success wins; when
//! every strategy fails the caller gets an error and no record is created.
//!
//! Field extraction is alias- and case-tolerant for the keys the service is
//! known to emit, and normalizes every absent field to a sentinel string so
//! downstream code never sees a hole.

use campricer_common::types::{CameraRecord, NO_INFORMATION, PRICE_UNAVAILABLE, UNKNOWN_CAMERA};
use serde_json::Value;
use thiserror::Error;

/// Parser errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// No strategy could extract a JSON object from the payload
    #[error("Malformed recognition payload: {0}")]
    MalformedPayload(String),
}

/// Parse a raw recognition response body into a canonical record
pub fn parse_response(body: &Value, image_uri: Option<String>) -> Result<CameraRecord, ParseError> {
    let document = extract_document(body)?;
    Ok(record_from_document(&document, image_uri))
}

/// Unwrap the response envelope down to the camera document
///
/// Per-item responses wrap the document in a `result` string; batched
/// responses sometimes return the document object directly, or under a
/// `result` object.
pub fn extract_document(body: &Value) -> Result<Value, ParseError> {
    match body.get("result") {
        Some(Value::String(raw)) => extract_from_text(raw),
        Some(object @ Value::Object(_)) => Ok(object.clone()),
        _ if body.is_object() => Ok(body.clone()),
        _ => Err(ParseError::MalformedPayload(
            "response body is neither an object nor a result wrapper".to_string(),
        )),
    }
}

/// Extract a JSON object from loosely structured text
pub fn extract_from_text(raw: &str) -> Result<Value, ParseError> {
    type Strategy = fn(&str) -> Option<Value>;
    const STRATEGIES: &[(&str, Strategy)] = &[
        ("direct", decode_direct),
        ("fence-stripped", decode_fenced),
        ("brace-scan", decode_braced),
    ];

    for (name, strategy) in STRATEGIES {
        if let Some(document) = strategy(raw) {
            tracing::debug!(strategy = name, "extracted recognition document");
            return Ok(document);
        }
    }
    Err(ParseError::MalformedPayload(format!(
        "no JSON object found in {} bytes of response text",
        raw.len()
    )))
}

fn as_object(value: Value) -> Option<Value> {
    value.is_object().then_some(value)
}

/// Strategy 1: the text is already JSON. A decode that yields a string means
/// the payload was double-encoded; unwrap one level and decode again.
fn decode_direct(raw: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(raw.trim()).ok()? {
        Value::String(inner) => serde_json::from_str(&inner).ok().and_then(as_object),
        other => as_object(other),
    }
}

/// Strategy 2: strip a surrounding markdown code fence, then decode
fn decode_fenced(raw: &str) -> Option<Value> {
    let stripped = strip_fences(raw);
    serde_json::from_str(stripped.trim()).ok().and_then(as_object)
}

/// Remove leading/trailing ``` fences, tolerating a language tag of any
/// casing (```json, ```JavaScript, ...) after the opening fence
fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    let text = text.trim_end();
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim().to_string()
}

/// Strategy 3: greedy scan from the first `{` to the last `}`
fn decode_braced(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok().and_then(as_object)
}

/// Build the canonical record from a decoded document, applying sentinel
/// defaults for every absent field
fn record_from_document(document: &Value, image_uri: Option<String>) -> CameraRecord {
    let title = text_field(document, &["camera", "name"]);
    if title.is_none() {
        tracing::warn!("no camera name found in recognition response");
    }

    let pricing = document.get("estimated_resale_value");
    if pricing.is_none() {
        tracing::warn!("no pricing data found in recognition response");
    }
    let empty = Value::Object(Default::default());
    let pricing = pricing.unwrap_or(&empty);

    let information = document
        .get("camera_information")
        .and_then(|info| text_field(info, &["information", "description"]));

    CameraRecord {
        title: title.unwrap_or_else(|| UNKNOWN_CAMERA.to_string()),
        loose_price: price_field(pricing, &["eBay", "ebay"]),
        cib_price: price_field(pricing, &["Amazon", "amazon"]),
        new_price: price_field(pricing, &["Facebook_Marketplace", "facebook_marketplace"]),
        information: information.unwrap_or_else(|| NO_INFORMATION.to_string()),
        image_uri,
    }
}

fn text_field(container: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| container.get(*key))
        .and_then(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
}

fn price_field(pricing: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| pricing.get(*key))
        .and_then(price_text)
        .unwrap_or_else(|| PRICE_UNAVAILABLE.to_string())
}

/// Models sometimes emit bare numbers where a price string is expected
fn price_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
