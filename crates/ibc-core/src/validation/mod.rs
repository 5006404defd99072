//! Upload request validation
//!
//! The accepted fields are declared once in [`ASSET_SCHEMA`]. Validation walks
//! the schema in declaration order, so a request missing several required
//! fields always reports the first one.

mod sanitize;

pub use sanitize::sanitize_text;

use crate::error::ValidationError;
use crate::models::{AssetKind, IngestionRequest, ValidatedAssetRecord};
use serde_json::Value;
use std::collections::HashMap;

/// Declared type of a request field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
}

/// Whether a field must be present, and its default otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional { default: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub presence: Presence,
}

const fn required(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        presence: Presence::Required,
    }
}

const fn optional(name: &'static str, default: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        field_type: FieldType::Text,
        presence: Presence::Optional { default },
    }
}

pub const ASSET_SCHEMA: &[FieldSpec] = &[
    required("url", FieldType::Text),
    required("name", FieldType::Text),
    required("type", FieldType::Text),
    required("filename", FieldType::Text),
    required("filesize", FieldType::Number),
    optional("_aid", ""),
    optional("description", ""),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Text(String),
    Number(i64),
}

/// Coerced values keyed by schema field name
#[derive(Debug, Default)]
struct FieldValues(HashMap<&'static str, FieldValue>);

impl FieldValues {
    fn text(&mut self, name: &str) -> String {
        match self.0.remove(name) {
            Some(FieldValue::Text(value)) => value,
            Some(FieldValue::Number(value)) => value.to_string(),
            None => String::new(),
        }
    }

    fn number(&mut self, name: &str) -> i64 {
        match self.0.remove(name) {
            Some(FieldValue::Number(value)) => value,
            Some(FieldValue::Text(value)) => parse_number(&value),
            None => 0,
        }
    }
}

/// Validate and normalize the `data` mapping of an upload request.
///
/// Keys that are not part of the schema are ignored.
pub fn validate(raw: &IngestionRequest) -> Result<ValidatedAssetRecord, ValidationError> {
    let mut values = FieldValues::default();

    for spec in ASSET_SCHEMA {
        let value = match (raw.get(spec.name), spec.presence) {
            (Some(value), _) => coerce(spec.field_type, value),
            (None, Presence::Required) => return Err(ValidationError::MissingField(spec.name)),
            (None, Presence::Optional { default }) => FieldValue::Text(default.to_string()),
        };
        values.0.insert(spec.name, value);
    }

    let url = values.text("url");
    if url.is_empty() {
        return Err(ValidationError::EmptyField("url"));
    }

    Ok(ValidatedAssetRecord {
        url,
        name: values.text("name"),
        kind: AssetKind::from(values.text("type")),
        filename: values.text("filename"),
        filesize: values.number("filesize"),
        auth_token: values.text("_aid"),
        description: values.text("description"),
    })
}

fn coerce(field_type: FieldType, value: &Value) -> FieldValue {
    match field_type {
        FieldType::Number => FieldValue::Number(coerce_number(value)),
        FieldType::Text => FieldValue::Text(coerce_text(value)),
    }
}

/// Best-effort integer coercion: anything that is not a number yields 0.
pub fn coerce_number(value: &Value) -> i64 {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(text) => parse_number(text),
        Value::Bool(flag) => i64::from(*flag),
        Value::Null | Value::Array(_) | Value::Object(_) => 0,
    }
}

fn parse_number(text: &str) -> i64 {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        })
        .unwrap_or(0)
}

pub fn coerce_text(value: &Value) -> String {
    let text = match value {
        Value::String(text) => sanitize_text(text),
        Value::Number(number) => number.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    };
    text.trim().to_string()
}
