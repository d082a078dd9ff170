use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::model::{COL_LATITUDE, COL_LONGITUDE, COL_PM25, COL_YEAR, COLUMNS, Entry};

/// One offending field in a rejected payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a JSON payload against the entry shape and build an [`Entry`].
///
/// Every problem is collected, so a payload missing `Year` with a string
/// `PM25` reports both fields at once.
pub fn validate_entry(payload: &JsonValue) -> Result<Entry, Vec<FieldError>> {
    let Some(obj) = payload.as_object() else {
        return Err(vec![FieldError::new("body", "expected a JSON object")]);
    };

    let mut errors = Vec::new();

    let year = field(obj, COL_YEAR, &mut errors, as_year);
    let latitude = field(obj, COL_LATITUDE, &mut errors, as_number);
    let longitude = field(obj, COL_LONGITUDE, &mut errors, as_number);
    let pm25 = field(obj, COL_PM25, &mut errors, as_number);

    for key in obj.keys().filter(|k| !COLUMNS.contains(&k.as_str())) {
        errors.push(FieldError::new(key.as_str(), "unknown field"));
    }

    match (year, latitude, longitude, pm25) {
        (Some(year), Some(latitude), Some(longitude), Some(pm25)) if errors.is_empty() => {
            Ok(Entry::new(year, latitude, longitude, pm25))
        }
        _ => Err(errors),
    }
}

fn field<T>(
    obj: &Map<String, JsonValue>,
    name: &str,
    errors: &mut Vec<FieldError>,
    convert: fn(&JsonValue) -> Result<T, &'static str>,
) -> Option<T> {
    let Some(value) = obj.get(name) else {
        errors.push(FieldError::new(name, "field required"));
        return None;
    };
    match convert(value) {
        Ok(v) => Some(v),
        Err(msg) => {
            errors.push(FieldError::new(name, msg));
            None
        }
    }
}

/// Integers, or floats with no fractional part (`2020.0`).
fn as_year(value: &JsonValue) -> Result<i64, &'static str> {
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    match value.as_f64() {
        Some(f) if f.fract() != 0.0 => Err("expected an integer, got a fractional number"),
        Some(f) if f.abs() < i64::MAX as f64 => Ok(f as i64),
        Some(_) => Err("integer out of range"),
        None => Err("expected an integer"),
    }
}

fn as_number(value: &JsonValue) -> Result<f64, &'static str> {
    value.as_f64().ok_or("expected a number")
}
