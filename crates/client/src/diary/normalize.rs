//! Entry body normalization.
//!
//! Early document layouts stored location and weather as flat fields
//! (`city`, `lat`, `lon`, `tmax`, `tmin`, `desc`) and predate `inkUsed`.
//! Normalization lifts those into the nested `loc`/`weather` objects and
//! backfills `inkUsed` from the text length, so every body the engine
//! hands out has one shape. A body that is not a JSON object passes
//! through untouched.

use serde_json::{Map, Value};

const LOC_FIELDS: [&str; 3] = ["lat", "lon", "city"];
const WEATHER_FIELDS: [&str; 3] = ["tmax", "tmin", "desc"];

fn lift(doc: &mut Map<String, Value>, target: &str, fields: &[&str]) {
    if doc.contains_key(target) {
        for field in fields {
            doc.remove(*field);
        }
        return;
    }

    let mut nested = Map::new();
    for field in fields {
        if let Some(value) = doc.remove(*field) {
            if !value.is_null() {
                nested.insert((*field).to_string(), value);
            }
        }
    }
    if !nested.is_empty() {
        doc.insert(target.to_string(), Value::Object(nested));
    }
}

/// Normalize a raw entry body to the current document shape.
pub fn normalize_entry(body: &str) -> String {
    let Ok(Value::Object(mut doc)) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    lift(&mut doc, "loc", &LOC_FIELDS);
    lift(&mut doc, "weather", &WEATHER_FIELDS);

    if let Some(text) = doc.get("text").and_then(Value::as_str) {
        let ink = text.chars().count() as u64;
        if !doc.get("inkUsed").is_some_and(Value::is_number) {
            doc.insert("inkUsed".to_string(), Value::from(ink));
        }
    }

    serde_json::to_string(&Value::Object(doc)).unwrap_or_else(|_| body.to_string())
}
