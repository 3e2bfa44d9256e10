//! Property compiler: field specs to schema-document properties.
//!
//! The type mapping here is intentionally coarser than the model builder's:
//! only integers, floats and objects keep their own schema type, everything
//! else is described as a string.

use serde::{Serialize, Serializer};
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::CompileError;
use crate::spec::{FieldSpec, join_path};

/// Schema type tag of a compiled property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Integer,
    Number,
    Object,
    String,
}

impl SchemaType {
    /// Maps a metadata type name to a schema type.
    ///
    /// # Examples
    ///
    /// ```
    /// use field_schema_core::SchemaType;
    ///
    /// assert_eq!(SchemaType::from_type_name("int"), SchemaType::Integer);
    /// assert_eq!(SchemaType::from_type_name("Float"), SchemaType::Number);
    /// assert_eq!(SchemaType::from_type_name("boolean"), SchemaType::String);
    /// ```
    pub fn from_type_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Self::Integer,
            "float" | "number" => Self::Number,
            "object" => Self::Object,
            _ => Self::String,
        }
    }
}

/// Format annotation of a compiled property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFormat {
    Float,
}

/// A normalized schema-document property.
///
/// Serialized with camelCase keys; absent optional parts are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<SchemaFormat>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
}

/// Ordered mapping from property name to [`SchemaProperty`].
///
/// Serializes as a JSON object in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyMap(Vec<(String, SchemaProperty)>);

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a property, replacing an existing entry of the same name.
    pub fn insert(&mut self, name: String, property: SchemaProperty) {
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = property,
            None => self.0.push((name, property)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaProperty> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaProperty)> {
        self.0.iter().map(|(n, p)| (n.as_str(), p))
    }
}

impl FromIterator<(String, SchemaProperty)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, SchemaProperty)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, property) in iter {
            map.insert(name, property);
        }
        map
    }
}

impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(n, p)| (n, p)))
    }
}

/// Compiles one field spec into a [`SchemaProperty`].
///
/// # Errors
///
/// Returns [`CompileError::Coercion`] if a numeric field declares a default
/// that cannot be converted to its type.
///
/// # Examples
///
/// ```
/// use field_schema_core::{FieldSpec, SchemaType, compile_property};
/// use serde_json::json;
///
/// let property = compile_property(&FieldSpec::new("titi", "float").with_default(json!("3"))).unwrap();
/// assert_eq!(property.schema_type, SchemaType::Number);
/// assert_eq!(property.default, Some(json!(3.0)));
/// assert_eq!(property.description, "");
/// ```
pub fn compile_property(spec: &FieldSpec) -> Result<SchemaProperty, CompileError> {
    compile_at(spec, &spec.name)
}

/// Compiles every top-level field spec, preserving input order.
///
/// The first failure aborts the whole mapping.
pub fn compile_properties(specs: &[FieldSpec]) -> Result<PropertyMap, CompileError> {
    specs
        .iter()
        .map(|spec| -> Result<_, CompileError> {
            Ok((spec.name.clone(), compile_property(spec)?))
        })
        .collect()
}

fn compile_at(spec: &FieldSpec, path: &str) -> Result<SchemaProperty, CompileError> {
    let schema_type = SchemaType::from_type_name(&spec.type_name);

    let default = match &spec.default {
        None | Some(Value::Null) => None,
        Some(value) => Some(match schema_type {
            SchemaType::Integer => coerce_integer(path, value)?,
            SchemaType::Number => coerce_float(path, value)?,
            SchemaType::Object | SchemaType::String => value.clone(),
        }),
    };

    let properties = match &spec.properties {
        Some(nested) => Some(
            nested
                .iter()
                .map(|child| -> Result<_, CompileError> {
                    let child_path = join_path(path, &child.name);
                    Ok((child.name.clone(), compile_at(child, &child_path)?))
                })
                .collect::<Result<PropertyMap, CompileError>>()?,
        ),
        None => None,
    };

    debug!(field = %path, schema_type = ?schema_type, "Compiled schema property");

    Ok(SchemaProperty {
        schema_type,
        format: (schema_type == SchemaType::Number).then_some(SchemaFormat::Float),
        description: spec.description.clone().unwrap_or_default(),
        default,
        minimum: spec.minimum.clone(),
        maximum: spec.maximum.clone(),
        min_length: spec.min_length.clone(),
        max_length: spec.max_length.clone(),
        min_items: spec.min_items.clone(),
        max_items: spec.max_items.clone(),
        properties,
    })
}

/// Converts a declared default to an exact integer.
///
/// Floats truncate toward zero, numeric strings are parsed after trimming
/// and booleans become 1/0.
pub(crate) fn coerce_integer(field: &str, value: &Value) -> Result<Value, CompileError> {
    let fail = |reason: &str| coercion_error(field, "integer", value, reason);
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else if n.is_u64() {
                Err(fail("out of range for a 64-bit integer"))
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                float_to_integer(f).ok_or_else(|| fail("out of range for a 64-bit integer"))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| fail("not an integer literal")),
        Value::Bool(b) => Ok(Value::from(i64::from(*b))),
        _ => Err(fail("expected a number")),
    }
}

/// Converts a declared default to a floating value.
pub(crate) fn coerce_float(field: &str, value: &Value) -> Result<Value, CompileError> {
    let fail = |reason: &str| coercion_error(field, "float", value, reason);
    let f = match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| fail("not representable as a float"))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| fail("not a float literal"))?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return Err(fail("expected a number")),
    };
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| fail("not a finite number"))
}

fn float_to_integer(f: f64) -> Option<Value> {
    let truncated = f.trunc();
    // i64::MAX is not exactly representable; 2^63 is the first value out of range.
    if truncated.is_finite()
        && truncated >= -9_223_372_036_854_775_808.0
        && truncated < 9_223_372_036_854_775_808.0
    {
        Some(Value::from(truncated as i64))
    } else {
        None
    }
}

fn coercion_error(field: &str, kind: &str, value: &Value, reason: &str) -> CompileError {
    CompileError::Coercion {
        field: field.to_string(),
        kind: kind.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
