//! Raw field metadata.
//!
//! Metadata arrives as an ordered JSON mapping from field name to a raw
//! spec object. [`parse_metadata`] turns it into [`FieldSpec`] values while
//! keeping two things the later stages depend on: the input order of the
//! fields, and whether a `default` key was present at all (as opposed to
//! present with a `null` value).
//!
//! # Example metadata
//!
//! ```json
//! {
//!   "toto": {"type": "integer", "default": 1, "minimum": 0, "maximum": 10},
//!   "address": {
//!     "type": "object",
//!     "default": null,
//!     "properties": {"city": {"type": "string", "default": "NYC"}}
//!   }
//! }
//! ```

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::CompileError;
use crate::types::PrimitiveKind;

/// One field of the metadata input.
///
/// # Examples
///
/// ```
/// use field_schema_core::FieldSpec;
/// use serde_json::json;
///
/// let spec = FieldSpec::new("city", "string")
///     .with_default(json!("NYC"))
///     .with_description("City name");
/// assert!(spec.has_default());
/// assert!(!spec.is_nested());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    /// Declared type name, as written in the metadata.
    pub type_name: String,
    pub description: Option<String>,
    pub title: Option<String>,
    /// `None` when the key is absent, `Some(Value::Null)` for an explicit null.
    pub default: Option<Value>,
    pub minimum: Option<Value>,
    pub maximum: Option<Value>,
    pub min_length: Option<Value>,
    pub max_length: Option<Value>,
    pub min_items: Option<Value>,
    pub max_items: Option<Value>,
    /// Nested field specs, in input order.
    pub properties: Option<Vec<FieldSpec>>,
}

impl FieldSpec {
    /// Creates a spec with only a name and type.
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            description: None,
            title: None,
            default: None,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            min_items: None,
            max_items: None,
            properties: None,
        }
    }

    /// Sets the declared default (use `Value::Null` for an explicit null).
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Attaches nested field specs.
    pub fn with_properties(mut self, properties: Vec<FieldSpec>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Primitive kind the declared type resolves to.
    pub fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::resolve(&self.type_name)
    }

    /// Returns `true` if the metadata declared a `default` key.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Returns `true` for object-typed specs that carry nested properties.
    pub fn is_nested(&self) -> bool {
        self.kind() == PrimitiveKind::Mapping && self.properties.is_some()
    }
}

/// Parses a raw metadata mapping into ordered field specs.
///
/// # Errors
///
/// Returns [`CompileError::InvalidFieldSpec`] if the input is not an object,
/// an entry is not an object, `type` is missing or not a string, or
/// `properties` is not an object.
///
/// # Examples
///
/// ```
/// use field_schema_core::parse_metadata;
/// use serde_json::json;
///
/// let specs = parse_metadata(&json!({
///     "b": {"type": "int", "default": 1},
///     "a": {"type": "string", "default": null},
/// }))
/// .unwrap();
///
/// let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
/// assert_eq!(names, vec!["b", "a"]);
/// assert_eq!(specs[1].default, Some(serde_json::Value::Null));
/// ```
pub fn parse_metadata(raw: &Value) -> Result<Vec<FieldSpec>, CompileError> {
    let map = raw
        .as_object()
        .ok_or_else(|| CompileError::invalid("<metadata>", "metadata must be an object"))?;
    parse_entries(map, "")
}

fn parse_entries(map: &Map<String, Value>, parent: &str) -> Result<Vec<FieldSpec>, CompileError> {
    map.iter()
        .map(|(name, entry)| parse_entry(name, entry, &join_path(parent, name)))
        .collect()
}

fn parse_entry(name: &str, entry: &Value, path: &str) -> Result<FieldSpec, CompileError> {
    let object = entry
        .as_object()
        .ok_or_else(|| CompileError::invalid(path, "field spec must be an object"))?;

    let type_name = match object.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(_) => return Err(CompileError::invalid(path, "`type` must be a string")),
        None => return Err(CompileError::invalid(path, "missing `type`")),
    };
    if PrimitiveKind::from_type_name(&type_name).is_none() {
        warn!(field = %path, type_name = %type_name, "Unrecognized type, treating as string");
    }

    let properties = match object.get("properties") {
        Some(Value::Object(nested)) => Some(parse_entries(nested, path)?),
        Some(_) => return Err(CompileError::invalid(path, "`properties` must be an object")),
        None => None,
    };

    Ok(FieldSpec {
        name: name.to_string(),
        type_name,
        description: optional_string(object, "description", path)?,
        title: optional_string(object, "title", path)?,
        default: object.get("default").cloned(),
        minimum: object.get("minimum").cloned(),
        maximum: object.get("maximum").cloned(),
        min_length: first_of(object, &["minLength", "min_length"]),
        max_length: first_of(object, &["maxLength", "max_length"]),
        min_items: first_of(object, &["minItems", "min_items"]),
        max_items: first_of(object, &["maxItems", "max_items"]),
        properties,
    })
}

fn optional_string(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<String>, CompileError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CompileError::invalid(path, format!("`{key}` must be a string"))),
    }
}

fn first_of(object: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| object.get(*key).cloned())
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
