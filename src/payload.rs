use crate::model::{ExpansionPayload, GraphPayload};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

static JSON_OBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("response is not valid JSON: {0}")]
    Syntax(String),
    #[error("response is missing the `{0}` array")]
    MissingArray(&'static str),
    #[error("response has an invalid structure: {0}")]
    Structure(#[from] serde_json::Error),
    #[error("recorded expansion key {0:?} is not a node id")]
    InvalidKey(String),
}

/// Outermost `{ ... }` span of a completion, or the trimmed text when there is none.
///
/// Models like to wrap the object in prose or code fences.
pub fn extract_json_object(text: &str) -> &str {
    match JSON_OBJECT_RE.find(text) {
        Some(found) => found.as_str(),
        None => text.trim(),
    }
}

/// Parses a completion strictly first, then as JSON5 to tolerate trailing commas and comments.
pub fn parse_json_value(text: &str) -> Result<Value, PayloadError> {
    let json = extract_json_object(text);
    match serde_json::from_str::<Value>(json) {
        Ok(value) => Ok(value),
        Err(strict) => json5::from_str::<Value>(json).map_err(|_| PayloadError::Syntax(strict.to_string())),
    }
}

pub fn parse_graph_payload(text: &str) -> Result<GraphPayload, PayloadError> {
    parse_structured(text)
}

pub fn parse_expansion_payload(text: &str) -> Result<ExpansionPayload, PayloadError> {
    parse_structured(text)
}

fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, PayloadError> {
    let value = parse_json_value(text)?;
    for key in ["nodes", "edges"] {
        if !value.get(key).is_some_and(Value::is_array) {
            return Err(PayloadError::MissingArray(key));
        }
    }
    Ok(serde_json::from_value(value)?)
}
