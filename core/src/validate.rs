//! Request payload validation against a model descriptor.
//!
//! Validation is what the serving layer runs before handing fields to its
//! entrypoint. It enforces the same rules the generated model encodes:
//! unknown keys are rejected (the compiled component is closed with
//! `additionalProperties: false`), required fields must be present, values
//! must match their primitive kind, and bounds are inclusive.
//!
//! All violations are collected rather than stopping at the first one, so
//! the failure message for a given payload is always the same.
//!
//! # Examples
//!
//! ```
//! use field_schema_core::*;
//! use serde_json::json;
//!
//! let specs = parse_metadata(&json!({
//!     "toto": {"type": "integer", "default": 1, "minimum": 0, "maximum": 10},
//!     "titi": {"type": "float", "default": 2.0},
//! }))
//! .unwrap();
//! let model = build_model(&specs, "Inputs").unwrap();
//!
//! let fields = validate_payload(&model, &json!({"toto": 4})).unwrap();
//! assert_eq!(serde_json::Value::Object(fields), json!({"toto": 4, "titi": 2.0}));
//!
//! let errors = validate_payload(&model, &json!({"toto": 11, "extra": true})).unwrap_err();
//! assert_eq!(errors.len(), 2);
//! ```

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::spec::join_path;
use crate::types::{
    BindingKind, ConstraintKind, FieldBinding, FieldDefault, ModelDescriptor, PrimitiveKind,
};

/// A single payload violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct PayloadError {
    /// Dotted field path, or the model name for errors about the payload itself.
    pub path: String,
    pub message: String,
}

impl PayloadError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Validates `payload` against `model`.
///
/// On success returns the normalized field values in model order, with
/// defaults filled in for absent optional fields and floats widened from
/// integers.
///
/// # Errors
///
/// Returns every [`PayloadError`] found, in field order.
pub fn validate_payload(
    model: &ModelDescriptor,
    payload: &Value,
) -> Result<Map<String, Value>, Vec<PayloadError>> {
    let mut errors = Vec::new();
    let fields = match payload.as_object() {
        Some(object) => validate_object(model, object, "", &mut errors),
        None => {
            errors.push(PayloadError::new(&model.name, "payload must be a JSON object"));
            Map::new()
        }
    };

    if errors.is_empty() {
        Ok(fields)
    } else {
        Err(errors)
    }
}

/// Joins payload errors into one human-readable message.
pub fn describe_errors(errors: &[PayloadError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn validate_object(
    model: &ModelDescriptor,
    object: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<PayloadError>,
) -> Map<String, Value> {
    for key in object.keys() {
        if model.field(key).is_none() {
            errors.push(PayloadError::new(&join_path(prefix, key), "unexpected field"));
        }
    }

    let mut fields = Map::new();
    for binding in &model.fields {
        let path = join_path(prefix, &binding.name);
        let value = match (object.get(&binding.name), &binding.default) {
            (None, FieldDefault::Required) => {
                errors.push(PayloadError::new(&path, "missing required field"));
                continue;
            }
            (None, FieldDefault::Null) => Value::Null,
            (None, FieldDefault::Value(default)) => default.clone(),
            (Some(Value::Null), FieldDefault::Null) => Value::Null,
            (Some(Value::Null), _) => {
                errors.push(PayloadError::new(&path, "must not be null"));
                continue;
            }
            (Some(value), _) => match validate_value(binding, value, &path, errors) {
                Some(value) => value,
                None => continue,
            },
        };
        fields.insert(binding.name.clone(), value);
    }
    fields
}

fn validate_value(
    binding: &FieldBinding,
    value: &Value,
    path: &str,
    errors: &mut Vec<PayloadError>,
) -> Option<Value> {
    let kind = match &binding.kind {
        BindingKind::Reference(nested) => {
            let Some(object) = value.as_object() else {
                errors.push(PayloadError::new(path, format!("expected object `{}`", nested.name)));
                return None;
            };
            let before = errors.len();
            let fields = validate_object(nested, object, path, errors);
            return (errors.len() == before).then_some(Value::Object(fields));
        }
        BindingKind::Primitive(kind) => *kind,
    };

    let Some(normalized) = coerce_primitive(kind, value) else {
        errors.push(PayloadError::new(path, format!("expected {}", kind.type_repr())));
        return None;
    };

    let before = errors.len();
    for constraint in &binding.constraints {
        check_constraint(constraint.kind, &constraint.value, &normalized, path, errors);
    }
    (errors.len() == before).then_some(normalized)
}

fn coerce_primitive(kind: PrimitiveKind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (PrimitiveKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            Some(value.clone())
        }
        (PrimitiveKind::Integer, Value::Number(n)) => {
            let f = n.as_f64()?;
            if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                Some(Value::from(f as i64))
            } else {
                None
            }
        }
        (PrimitiveKind::Float, Value::Number(n)) => n.as_f64().and_then(Number::from_f64).map(Value::Number),
        (PrimitiveKind::String, Value::String(_))
        | (PrimitiveKind::Boolean, Value::Bool(_))
        | (PrimitiveKind::Sequence, Value::Array(_))
        | (PrimitiveKind::Mapping, Value::Object(_)) => Some(value.clone()),
        _ => None,
    }
}

fn check_constraint(
    kind: ConstraintKind,
    bound: &Number,
    value: &Value,
    path: &str,
    errors: &mut Vec<PayloadError>,
) {
    let actual = if kind.is_length() {
        match value {
            Value::String(s) => s.chars().count() as f64,
            Value::Array(items) => items.len() as f64,
            _ => return,
        }
    } else {
        match value.as_f64() {
            Some(f) => f,
            None => return,
        }
    };
    let Some(limit) = bound.as_f64() else { return };

    let violated = match kind {
        ConstraintKind::Minimum | ConstraintKind::MinLength => actual < limit,
        ConstraintKind::Maximum | ConstraintKind::MaxLength => actual > limit,
    };
    if violated {
        let message = match kind {
            ConstraintKind::Minimum => format!("must be greater than or equal to {bound}"),
            ConstraintKind::Maximum => format!("must be less than or equal to {bound}"),
            ConstraintKind::MinLength => format!("length must be at least {bound}"),
            ConstraintKind::MaxLength => format!("length must be at most {bound}"),
        };
        errors.push(PayloadError::new(path, message));
    }
}
