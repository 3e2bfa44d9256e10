//! Typed model definitions produced by the compiler.
//!
//! A [`ModelDescriptor`] is the in-memory description of a typed model: an
//! ordered list of [`FieldBinding`]s, each either a primitive value or a
//! reference to a nested descriptor. Descriptors are plain values rebuilt on
//! every compilation run; nested descriptors are held behind an [`Arc`] so a
//! single descriptor can be reachable from several fields and still be
//! recognised as the same model.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Version of the generated source format.
///
/// Written into the declaration line of every generated source unit and
/// checked by [`parse_source`](crate::parse_source).
pub const SOURCE_FORMAT_VERSION: &str = "field-schema/1";

/// Primitive kind of a leaf field.
///
/// Resolved from the metadata `type` string. Matching is case-insensitive
/// and accepts the usual aliases; unrecognized names fall back to
/// [`PrimitiveKind::String`].
///
/// # Examples
///
/// ```
/// use field_schema_core::PrimitiveKind;
///
/// assert_eq!(PrimitiveKind::resolve("INT"), PrimitiveKind::Integer);
/// assert_eq!(PrimitiveKind::resolve("number"), PrimitiveKind::Float);
/// assert_eq!(PrimitiveKind::resolve("uuid"), PrimitiveKind::String);
/// assert_eq!(PrimitiveKind::Sequence.type_repr(), "list<any>");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// `integer` / `int`
    Integer,
    /// `float` / `number`
    Float,
    /// `string` / `str`, and the fallback for unknown names.
    String,
    /// `boolean` / `bool`
    Boolean,
    /// `array` / `list`, an untyped sequence.
    Sequence,
    /// `object` / `dict`, an untyped mapping.
    Mapping,
}

impl PrimitiveKind {
    /// Every kind, in declaration order.
    pub const ALL: [PrimitiveKind; 6] = [
        Self::Integer,
        Self::Float,
        Self::String,
        Self::Boolean,
        Self::Sequence,
        Self::Mapping,
    ];

    /// Looks up a metadata type name, returning `None` for unknown names.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Some(Self::Integer),
            "float" | "number" => Some(Self::Float),
            "string" | "str" => Some(Self::String),
            "boolean" | "bool" => Some(Self::Boolean),
            "array" | "list" => Some(Self::Sequence),
            "object" | "dict" => Some(Self::Mapping),
            _ => None,
        }
    }

    /// Resolves a metadata type name, falling back to `String`.
    pub fn resolve(name: &str) -> Self {
        Self::from_type_name(name).unwrap_or(Self::String)
    }

    /// Canonical type representation used in generated source.
    pub fn type_repr(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Sequence => "list<any>",
            Self::Mapping => "map<string, any>",
        }
    }

    /// Inverse of [`type_repr`](Self::type_repr).
    pub fn from_type_repr(repr: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_repr() == repr)
    }

    /// Returns `true` for integer and float kinds.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_repr())
    }
}

/// Kind of a structural constraint carried on a field binding.
///
/// Item bounds of sequences are stored as length bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// Inclusive lower bound for numeric fields.
    Minimum,
    /// Inclusive upper bound for numeric fields.
    Maximum,
    /// Minimum string length or sequence item count.
    MinLength,
    /// Maximum string length or sequence item count.
    MaxLength,
}

impl ConstraintKind {
    /// Keyword used for this constraint in generated source.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::MinLength => "min_length",
            Self::MaxLength => "max_length",
        }
    }

    /// Parses a generated-source keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "minimum" => Some(Self::Minimum),
            "maximum" => Some(Self::Maximum),
            "min_length" => Some(Self::MinLength),
            "max_length" => Some(Self::MaxLength),
            _ => None,
        }
    }

    /// Returns `true` for the length-bound kinds.
    pub fn is_length(self) -> bool {
        matches!(self, Self::MinLength | Self::MaxLength)
    }
}

/// A single constraint as an explicit `{kind, value}` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub value: Number,
}

impl Constraint {
    pub fn new(kind: ConstraintKind, value: impl Into<Number>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Default state of a field binding.
///
/// `Required` is the only state in which the field must be supplied.
/// `Null` is an optional field whose fallback is the absent value, and
/// `Value` an optional field with a concrete fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    Required,
    Null,
    Value(Value),
}

impl FieldDefault {
    /// Wraps a declared default, mapping JSON `null` to [`FieldDefault::Null`].
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            other => Self::Value(other),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }

    /// Returns the concrete default value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// What a field binding resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    Primitive(PrimitiveKind),
    Reference(Arc<ModelDescriptor>),
}

/// One field of a [`ModelDescriptor`].
///
/// # Examples
///
/// ```
/// use field_schema_core::*;
///
/// let field = FieldBinding::primitive("count", PrimitiveKind::Integer)
///     .with_default(FieldDefault::Value(3.into()))
///     .with_constraint(Constraint::new(ConstraintKind::Minimum, 0));
///
/// assert!(!field.is_required());
/// assert_eq!(field.type_repr(), "integer");
/// assert!(field.constraint(ConstraintKind::Minimum).is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBinding {
    pub name: String,
    pub kind: BindingKind,
    pub default: FieldDefault,
    /// Empty when the metadata carries no description.
    pub description: String,
    pub title: Option<String>,
    pub constraints: Vec<Constraint>,
}

impl FieldBinding {
    /// Creates a primitive binding with a `null` default.
    pub fn primitive(name: &str, kind: PrimitiveKind) -> Self {
        Self::new(name, BindingKind::Primitive(kind))
    }

    /// Creates a required reference to a nested model.
    pub fn reference(name: &str, model: Arc<ModelDescriptor>) -> Self {
        Self {
            default: FieldDefault::Required,
            ..Self::new(name, BindingKind::Reference(model))
        }
    }

    fn new(name: &str, kind: BindingKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: FieldDefault::Null,
            description: String::new(),
            title: None,
            constraints: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_required()
    }

    /// Returns the value of the first constraint of `kind`.
    pub fn constraint(&self, kind: ConstraintKind) -> Option<&Number> {
        self.constraints
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| &c.value)
    }

    /// Returns the nested model this binding references, if any.
    pub fn nested(&self) -> Option<&Arc<ModelDescriptor>> {
        match &self.kind {
            BindingKind::Reference(model) => Some(model),
            BindingKind::Primitive(_) => None,
        }
    }

    /// Type representation used in generated source.
    ///
    /// Optional references are wrapped as `Option<Name>`.
    pub fn type_repr(&self) -> String {
        match &self.kind {
            BindingKind::Primitive(kind) => kind.type_repr().to_string(),
            BindingKind::Reference(model) if self.is_required() => model.name.clone(),
            BindingKind::Reference(model) => format!("Option<{}>", model.name),
        }
    }
}

/// Description of a typed model: a name and its ordered field bindings.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use field_schema_core::*;
///
/// let address = ModelDescriptor::new("Address")
///     .with_field(FieldBinding::primitive("city", PrimitiveKind::String));
/// let root = ModelDescriptor::new("Inputs")
///     .with_field(FieldBinding::reference("address", Arc::new(address)));
///
/// assert_eq!(root.field_names(), vec!["address"]);
/// assert_eq!(root.nested_models().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    pub fields: Vec<FieldBinding>,
}

impl ModelDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    /// Appends a field binding.
    pub fn with_field(mut self, field: FieldBinding) -> Self {
        self.fields.push(field);
        self
    }

    /// Finds a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldBinding> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Directly referenced nested models, in field order.
    pub fn nested_models(&self) -> impl Iterator<Item = &Arc<ModelDescriptor>> {
        self.fields.iter().filter_map(FieldBinding::nested)
    }
}

/// Returns `true` if `name` can be used as a field or model name in
/// generated source.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
