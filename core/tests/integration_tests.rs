//! End-to-end compilation tests over realistic metadata.

use field_schema_core::*;
use serde_json::{Value, json};

fn all_variables() -> Value {
    json!({
        "toto": {
            "type": "integer",
            "description": "Number of iterations",
            "default": 1,
            "minimum": 0,
            "maximum": 10
        },
        "titi": {"type": "float", "default": "3"},
        "name": {"type": "string", "default": null, "minLength": 1, "maxLength": 32},
        "verbose": {"type": "bool", "default": false},
        "tags": {"type": "list", "default": ["a"], "maxItems": 4},
        "extra": {"type": "dict", "default": {}},
        "address": {
            "type": "object",
            "default": null,
            "description": "Home address",
            "properties": {
                "city": {"type": "string", "default": "NYC"},
                "geo": {
                    "type": "object",
                    "properties": {
                        "lat": {"type": "number", "default": 0},
                        "lon": {"type": "number", "default": 0}
                    }
                }
            }
        }
    })
}

fn compile_default(metadata: &Value) -> Result<CompiledArtifacts, CompileError> {
    compile(metadata, DEFAULT_MODEL_NAME, &DocumentOptions::default())
}

#[test]
fn test_integer_and_float_defaults_are_coerced() {
    let artifacts = compile_default(&all_variables()).unwrap();
    let properties = &artifacts.document.component().properties;

    let toto = properties.get("toto").unwrap();
    assert_eq!(toto.schema_type, SchemaType::Integer);
    assert_eq!(toto.default, Some(json!(1)));
    assert_eq!(toto.minimum, Some(json!(0)));

    let titi = properties.get("titi").unwrap();
    assert_eq!(titi.schema_type, SchemaType::Number);
    assert_eq!(titi.format, Some(SchemaFormat::Float));
    assert_eq!(titi.default, Some(json!(3.0)));

    // Booleans, sequences and mappings are described as strings.
    assert_eq!(properties.get("verbose").unwrap().schema_type, SchemaType::String);
    assert_eq!(properties.get("tags").unwrap().schema_type, SchemaType::String);
    assert_eq!(properties.get("extra").unwrap().schema_type, SchemaType::String);
}

#[test]
fn test_compilation_is_deterministic() {
    let first = compile_default(&all_variables()).unwrap();
    let second = compile_default(&all_variables()).unwrap();

    assert_eq!(first.source, second.source);
    assert_eq!(
        serde_json::to_string(&first.document).unwrap(),
        serde_json::to_string(&second.document).unwrap()
    );
}

#[test]
fn test_nesting_example() {
    let metadata = json!({
        "address": {
            "type": "object",
            "default": null,
            "properties": {"city": {"type": "string", "default": "NYC"}}
        }
    });
    let artifacts = compile_default(&metadata).unwrap();

    let address = artifacts.model.field("address").unwrap();
    assert!(!address.is_required());
    assert_eq!(address.default, FieldDefault::Null);

    let nested = address.nested().unwrap();
    assert_eq!(nested.name, "Address");
    assert_eq!(nested.field_names(), vec!["city"]);
    assert!(artifacts.source.contains("model Address {\n    city: string = field(default = \"NYC\")\n}\n"));
    assert!(artifacts.source.contains("    address: Option<Address> = field(none)\n"));

    let property = artifacts.document.component().properties.get("address").unwrap();
    assert_eq!(property.schema_type, SchemaType::Object);
    assert_eq!(property.default, None);
    assert_eq!(property.properties.as_ref().unwrap().names(), vec!["city"]);
}

#[test]
fn test_source_round_trip_preserves_model() {
    let artifacts = compile_default(&all_variables()).unwrap();
    let reloaded = parse_source(&artifacts.source).unwrap();

    assert_eq!(reloaded, artifacts.model);
    assert_eq!(emit_source(&reloaded), artifacts.source);

    let geo = reloaded
        .field("address")
        .and_then(FieldBinding::nested)
        .and_then(|address| address.field("geo"))
        .unwrap();
    assert!(geo.is_required());
    assert_eq!(geo.type_repr(), "Geo");
}

#[test]
fn test_missing_default_produces_nothing() {
    let mut metadata = all_variables();
    metadata["address"]["properties"]["city"]
        .as_object_mut()
        .unwrap()
        .remove("default");

    let err = compile_default(&metadata).unwrap_err();
    assert_eq!(
        err,
        CompileError::MissingDefault {
            field: "address.city".to_string()
        }
    );
    assert!(err.to_string().contains("address.city"));
}

#[test]
fn test_document_is_closed_with_two_paths() {
    let artifacts = compile_default(&all_variables()).unwrap();
    let value = artifacts.document.to_value();

    assert_eq!(value["paths"].as_object().unwrap().len(), 2);
    assert_eq!(
        value["components"]["schemas"]["RunInput"]["additionalProperties"],
        json!(false)
    );
}

#[test]
fn test_generated_model_validates_payloads() {
    let artifacts = compile_default(&all_variables()).unwrap();
    let model = parse_source(&artifacts.source).unwrap();

    let fields = validate_payload(
        &model,
        &json!({"toto": 5, "address": {"city": "Paris", "geo": {"lat": 48.8}}}),
    )
    .unwrap();
    assert_eq!(fields["titi"], json!(3.0));
    assert_eq!(fields["address"]["geo"], json!({"lat": 48.8, "lon": 0.0}));

    let errors = validate_payload(&model, &json!({"toto": 20, "name": ""})).unwrap_err();
    let messages: Vec<_> = errors.iter().map(ToString::to_string).collect();
    assert_eq!(
        messages,
        vec![
            "toto: must be less than or equal to 10",
            "name: length must be at least 1",
        ]
    );
}
