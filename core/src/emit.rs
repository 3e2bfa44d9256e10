//! Source emitter: [`ModelDescriptor`] trees to generated model source.
//!
//! The generated unit is a self-contained text document:
//!
//! ```text
//! // This file is generated automatically by field-schema.
//! // Do not edit it by hand; regenerate it from the field metadata.
//!
//! format field-schema/1
//!
//! model Address {
//!     city: string = field(default = "NYC")
//! }
//!
//! model InputsClass {
//!     toto: integer = field(default = 1, minimum = 0, maximum = 10)
//!     address: Option<Address> = field(none, description = "Home address")
//! }
//! ```
//!
//! Nested models are emitted before the models that reference them. A
//! descriptor reachable through several fields is emitted once; the `seen`
//! set is keyed by descriptor identity, so two distinct descriptors with the
//! same shape still produce two blocks.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::types::{FieldBinding, FieldDefault, ModelDescriptor, SOURCE_FORMAT_VERSION};

/// Comment lines opening every generated unit.
pub const GENERATED_HEADER: &str = "// This file is generated automatically by field-schema.\n\
// Do not edit it by hand; regenerate it from the field metadata.";

/// Emits the generated source for `root` and every model it references.
///
/// Output is deterministic: the same descriptor tree always produces the
/// same text.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use field_schema_core::*;
/// use serde_json::json;
///
/// let address = ModelDescriptor::new("Address").with_field(
///     FieldBinding::primitive("city", PrimitiveKind::String)
///         .with_default(FieldDefault::Value(json!("NYC"))),
/// );
/// let root = ModelDescriptor::new("Inputs").with_field(
///     FieldBinding::reference("address", Arc::new(address)).with_default(FieldDefault::Null),
/// );
///
/// let source = emit_source(&root);
/// let address_at = source.find("model Address {").unwrap();
/// let inputs_at = source.find("model Inputs {").unwrap();
/// assert!(address_at < inputs_at);
/// assert!(source.contains("    address: Option<Address> = field(none)\n"));
/// ```
pub fn emit_source(root: &ModelDescriptor) -> String {
    let mut seen = HashSet::new();
    let mut blocks = Vec::new();
    collect_blocks(root, &mut seen, &mut blocks);

    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push_str("\n\n");
    out.push_str(&format!("format {SOURCE_FORMAT_VERSION}\n"));
    for block in &blocks {
        out.push('\n');
        out.push_str(block);
    }
    out
}

fn collect_blocks(
    model: &ModelDescriptor,
    seen: &mut HashSet<*const ModelDescriptor>,
    blocks: &mut Vec<String>,
) {
    if !seen.insert(model as *const ModelDescriptor) {
        return;
    }

    for nested in model.nested_models() {
        collect_blocks(nested, seen, blocks);
    }

    debug!(model = %model.name, "Emitting model block");
    blocks.push(render_block(model));
}

fn render_block(model: &ModelDescriptor) -> String {
    let mut block = format!("model {} {{\n", model.name);
    for field in &model.fields {
        block.push_str(&format!(
            "    {}: {} = field({})\n",
            field.name,
            field.type_repr(),
            field_arguments(field).join(", ")
        ));
    }
    block.push_str("}\n");
    block
}

/// Renders the argument list of a field expression.
///
/// A concrete default wins over the required/absent markers; description,
/// title and constraints follow in that order.
fn field_arguments(field: &FieldBinding) -> Vec<String> {
    let mut args = Vec::new();

    match &field.default {
        FieldDefault::Value(value) if !value.is_null() => args.push(format!("default = {value}")),
        FieldDefault::Required => args.push("required".to_string()),
        FieldDefault::Value(_) | FieldDefault::Null => args.push("none".to_string()),
    }

    if !field.description.is_empty() {
        args.push(format!(
            "description = {}",
            Value::String(field.description.clone())
        ));
    }
    if let Some(title) = &field.title {
        args.push(format!("title = {}", Value::String(title.clone())));
    }
    for constraint in &field.constraints {
        args.push(format!("{} = {}", constraint.kind.keyword(), constraint.value));
    }

    args
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::types::{Constraint, ConstraintKind, PrimitiveKind};
    use crate::{build_model, parse_metadata};

    #[test]
    fn test_field_argument_order() {
        let field = FieldBinding::primitive("toto", PrimitiveKind::Integer)
            .with_default(FieldDefault::Value(json!(1)))
            .with_description("How many \"totos\"")
            .with_title("Toto")
            .with_constraint(Constraint::new(ConstraintKind::Minimum, 0))
            .with_constraint(Constraint::new(ConstraintKind::Maximum, 10));

        assert_eq!(
            field_arguments(&field),
            vec![
                "default = 1",
                r#"description = "How many \"totos\"""#,
                r#"title = "Toto""#,
                "minimum = 0",
                "maximum = 10",
            ]
        );
    }

    #[test]
    fn test_required_and_absent_markers() {
        let nested = Arc::new(ModelDescriptor::new("Address"));
        let required = FieldBinding::reference("address", nested);
        let absent = FieldBinding::primitive("name", PrimitiveKind::String);

        assert_eq!(field_arguments(&required), vec!["required"]);
        assert_eq!(field_arguments(&absent), vec!["none"]);
    }

    #[test]
    fn test_full_document_layout() {
        let specs = parse_metadata(&json!({
            "toto": {"type": "integer", "default": 1, "minimum": 0, "maximum": 10},
            "address": {
                "type": "object",
                "default": null,
                "description": "Home address",
                "properties": {"city": {"type": "string", "default": "NYC"}}
            }
        }))
        .unwrap();
        let model = build_model(&specs, "InputsClass").unwrap();

        let expected = "\
// This file is generated automatically by field-schema.
// Do not edit it by hand; regenerate it from the field metadata.

format field-schema/1

model Address {
    city: string = field(default = \"NYC\")
}

model InputsClass {
    toto: integer = field(default = 1, minimum = 0, maximum = 10)
    address: Option<Address> = field(none, description = \"Home address\")
}
";
        assert_eq!(emit_source(&model), expected);
    }

    #[test]
    fn test_shared_descriptor_emitted_once() {
        let shared = Arc::new(ModelDescriptor::new("Point").with_field(
            FieldBinding::primitive("x", PrimitiveKind::Float)
                .with_default(FieldDefault::Value(json!(0.0))),
        ));
        let root = ModelDescriptor::new("Segment")
            .with_field(FieldBinding::reference("start", shared.clone()))
            .with_field(FieldBinding::reference("end", shared));

        let source = emit_source(&root);
        assert_eq!(source.matches("model Point {").count(), 1);
        assert!(source.contains("    end: Point = field(required)\n"));
    }

    #[test]
    fn test_identical_shapes_emitted_separately() {
        let place = || {
            Arc::new(ModelDescriptor::new("Place").with_field(
                FieldBinding::primitive("city", PrimitiveKind::String)
                    .with_default(FieldDefault::Value(json!("NYC"))),
            ))
        };
        let (home, work) = (place(), place());
        assert_eq!(home, work);
        assert!(!Arc::ptr_eq(&home, &work));

        let root = ModelDescriptor::new("Root")
            .with_field(FieldBinding::reference("home", home))
            .with_field(FieldBinding::reference("work", work));

        let source = emit_source(&root);
        assert_eq!(source.matches("model Place {").count(), 2);
    }

    #[test]
    fn test_sequence_and_mapping_type_repr() {
        let root = ModelDescriptor::new("Root")
            .with_field(FieldBinding::primitive("tags", PrimitiveKind::Sequence)
                .with_default(FieldDefault::Value(json!(["a", "b"]))))
            .with_field(FieldBinding::primitive("stuff", PrimitiveKind::Mapping)
                .with_default(FieldDefault::Value(json!({"a": 1}))));

        let source = emit_source(&root);
        assert!(source.contains(r#"    tags: list<any> = field(default = ["a","b"])"#));
        assert!(source.contains(r#"    stuff: map<string, any> = field(default = {"a":1})"#));
    }
}
