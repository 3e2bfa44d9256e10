//! Model builder: field specs to [`ModelDescriptor`] trees.
//!
//! Nested objects become nested descriptors named after their field
//! (`address` → `Address`). The builder guards against metadata that nests a
//! model inside itself by keeping the chain of model names from the root to
//! the descriptor being built; a nested object whose name matches one of its
//! ancestors is rejected with [`CompileError::CyclicSchema`].
//!
//! Two different nested objects that derive the same name (for example two
//! `address` fields under different parents) get numeric suffixes in the
//! order they are encountered (`Address`, `Address2`, ...), so every
//! descriptor in a tree has a distinct name.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Number, Value};
use tracing::debug;

use crate::error::CompileError;
use crate::property::{coerce_float, coerce_integer};
use crate::spec::{FieldSpec, join_path};
use crate::types::{
    BindingKind, Constraint, ConstraintKind, FieldBinding, FieldDefault, ModelDescriptor,
    PrimitiveKind, is_identifier,
};

/// Builds a model descriptor from field specs.
///
/// Fields keep their input order. Any structural problem aborts the whole
/// build; no partially populated descriptor is returned.
///
/// # Errors
///
/// - [`CompileError::MissingDefault`] if a leaf field has no `default` key.
/// - [`CompileError::Coercion`] if a numeric default cannot be converted.
/// - [`CompileError::CyclicSchema`] if a nested object repeats an ancestor's
///   model name.
/// - [`CompileError::InvalidFieldSpec`] for names that are not identifiers
///   and malformed constraints.
///
/// # Examples
///
/// ```
/// use field_schema_core::*;
/// use serde_json::json;
///
/// let specs = parse_metadata(&json!({
///     "address": {
///         "type": "object",
///         "default": null,
///         "properties": {"city": {"type": "string", "default": "NYC"}}
///     }
/// }))
/// .unwrap();
///
/// let model = build_model(&specs, "Inputs").unwrap();
/// let address = model.field("address").unwrap();
/// assert!(!address.is_required());
///
/// let nested = address.nested().unwrap();
/// assert_eq!(nested.name, "Address");
/// assert_eq!(
///     nested.field("city").unwrap().default,
///     FieldDefault::Value(json!("NYC"))
/// );
/// ```
pub fn build_model(specs: &[FieldSpec], model_name: &str) -> Result<ModelDescriptor, CompileError> {
    if !is_identifier(model_name) {
        return Err(CompileError::invalid(
            model_name,
            "model name must be an identifier",
        ));
    }

    let mut builder = ModelBuilder::default();
    builder.used_names.insert(model_name.to_string());
    builder.build(specs, model_name, model_name, "")
}

#[derive(Default)]
struct ModelBuilder {
    /// Base names of the models from the root down to the current one.
    ancestors: Vec<String>,
    /// Names already assigned to a descriptor in this tree.
    used_names: HashSet<String>,
}

impl ModelBuilder {
    fn build(
        &mut self,
        specs: &[FieldSpec],
        base_name: &str,
        model_name: &str,
        path: &str,
    ) -> Result<ModelDescriptor, CompileError> {
        self.ancestors.push(base_name.to_string());
        let result = self.build_fields(specs, model_name, path);
        self.ancestors.pop();
        result
    }

    fn build_fields(
        &mut self,
        specs: &[FieldSpec],
        model_name: &str,
        path: &str,
    ) -> Result<ModelDescriptor, CompileError> {
        let mut model = ModelDescriptor::new(model_name);

        for spec in specs {
            let field_path = join_path(path, &spec.name);
            if !is_identifier(&spec.name) {
                return Err(CompileError::invalid(
                    &field_path,
                    "field name must be an identifier",
                ));
            }

            let binding = if spec.is_nested() {
                self.build_nested(spec, &field_path)?
            } else {
                build_leaf(spec, &field_path)?
            };
            model.fields.push(binding);
        }

        debug!(model = %model.name, fields = model.fields.len(), "Built model descriptor");
        Ok(model)
    }

    fn build_nested(&mut self, spec: &FieldSpec, path: &str) -> Result<FieldBinding, CompileError> {
        let base_name = capitalize(&spec.name);
        if self.ancestors.contains(&base_name) {
            let mut chain = self.ancestors.clone();
            chain.push(base_name);
            return Err(CompileError::CyclicSchema {
                path: chain.join(" -> "),
            });
        }

        let model_name = self.assign_name(&base_name);
        let properties = spec.properties.as_deref().unwrap_or_default();
        let child = self.build(properties, &base_name, &model_name, path)?;

        let default = if spec.has_default() {
            FieldDefault::Null
        } else {
            FieldDefault::Required
        };

        Ok(FieldBinding {
            name: spec.name.clone(),
            kind: BindingKind::Reference(Arc::new(child)),
            default,
            description: spec.description.clone().unwrap_or_default(),
            title: spec.title.clone(),
            constraints: Vec::new(),
        })
    }

    fn assign_name(&mut self, base_name: &str) -> String {
        let mut candidate = base_name.to_string();
        let mut suffix = 2;
        while self.used_names.contains(&candidate) {
            candidate = format!("{base_name}{suffix}");
            suffix += 1;
        }
        self.used_names.insert(candidate.clone());
        candidate
    }
}

fn build_leaf(spec: &FieldSpec, path: &str) -> Result<FieldBinding, CompileError> {
    let kind = spec.kind();
    let declared = spec.default.as_ref().ok_or_else(|| CompileError::MissingDefault {
        field: path.to_string(),
    })?;

    let default = match (kind, declared) {
        (_, Value::Null) => FieldDefault::Null,
        (PrimitiveKind::Integer, value) => FieldDefault::Value(coerce_integer(path, value)?),
        (PrimitiveKind::Float, value) => FieldDefault::Value(coerce_float(path, value)?),
        (_, value) => FieldDefault::Value(value.clone()),
    };

    Ok(FieldBinding {
        name: spec.name.clone(),
        kind: BindingKind::Primitive(kind),
        default,
        description: spec.description.clone().unwrap_or_default(),
        title: spec.title.clone(),
        constraints: leaf_constraints(spec, kind, path)?,
    })
}

fn leaf_constraints(
    spec: &FieldSpec,
    kind: PrimitiveKind,
    path: &str,
) -> Result<Vec<Constraint>, CompileError> {
    let candidates = match kind {
        PrimitiveKind::Integer | PrimitiveKind::Float => [
            (ConstraintKind::Minimum, "minimum", &spec.minimum),
            (ConstraintKind::Maximum, "maximum", &spec.maximum),
        ],
        PrimitiveKind::String => [
            (ConstraintKind::MinLength, "minLength", &spec.min_length),
            (ConstraintKind::MaxLength, "maxLength", &spec.max_length),
        ],
        PrimitiveKind::Sequence => [
            (ConstraintKind::MinLength, "minItems", &spec.min_items),
            (ConstraintKind::MaxLength, "maxItems", &spec.max_items),
        ],
        PrimitiveKind::Boolean | PrimitiveKind::Mapping => return Ok(Vec::new()),
    };

    let mut constraints = Vec::new();
    for (constraint_kind, key, raw) in candidates {
        let Some(raw) = raw else { continue };
        constraints.push(Constraint {
            kind: constraint_kind,
            value: constraint_value(constraint_kind, key, raw, path)?,
        });
    }
    Ok(constraints)
}

fn constraint_value(
    kind: ConstraintKind,
    key: &str,
    raw: &Value,
    path: &str,
) -> Result<Number, CompileError> {
    match raw {
        Value::Number(n) if kind.is_length() && !n.is_u64() => Err(CompileError::invalid(
            path,
            format!("`{key}` must be a non-negative integer"),
        )),
        Value::Number(n) => Ok(n.clone()),
        _ => Err(CompileError::invalid(path, format!("`{key}` must be a number"))),
    }
}

/// Uppercases the first character of a field name.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
