//! Best-effort parsing of the user-supplied options blob.
//!
//! A malformed blob never fails a request: every field that cannot be
//! determined keeps its default and the problem is logged.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::types::{ConversionOptions, RecognitionMode};

const MODE_KEY: &str = "mode";
const RECOGNIZE_BULLETS_KEY: &str = "recognizeBullets";
const HORIZONTAL_PROXIMITY_KEY: &str = "relativeHorizontalProximity";

/// Parses a JSON options blob into [`ConversionOptions`]. Total: any input
/// yields a value.
pub fn parse_options(raw: &str) -> ConversionOptions {
    let raw = raw.trim();
    if raw.is_empty() {
        return ConversionOptions::default();
    }

    let object = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            warn!(kind = json_kind(&other), "Options blob is not a JSON object, using defaults");
            return ConversionOptions::default();
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse options JSON, using defaults");
            return ConversionOptions::default();
        }
    };

    let options = ConversionOptions {
        mode: parse_mode(&object),
        recognize_bullets: parse_bool(&object, RECOGNIZE_BULLETS_KEY),
        relative_horizontal_proximity: parse_number(&object, HORIZONTAL_PROXIMITY_KEY),
    };
    debug!(?options, "Parsed conversion options");
    options
}

fn parse_mode(object: &Map<String, Value>) -> RecognitionMode {
    match object.get(MODE_KEY) {
        None => RecognitionMode::default(),
        Some(Value::String(mode)) => match mode.to_ascii_lowercase().as_str() {
            "flow" => RecognitionMode::Flow,
            "textbox" => RecognitionMode::Textbox,
            other => {
                warn!(mode = other, "Unknown recognition mode, using flow");
                RecognitionMode::default()
            }
        },
        Some(other) => {
            warn!(kind = json_kind(other), "Option 'mode' is not a string, using flow");
            RecognitionMode::default()
        }
    }
}

fn parse_bool(object: &Map<String, Value>, key: &str) -> Option<bool> {
    match object.get(key)? {
        Value::Bool(value) => Some(*value),
        other => {
            warn!(key, kind = json_kind(other), "Option is not a boolean, ignoring");
            None
        }
    }
}

fn parse_number(object: &Map<String, Value>, key: &str) -> Option<f64> {
    match object.get(key)? {
        Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
        other => {
            warn!(key, kind = json_kind(other), "Option is not a number, ignoring");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
