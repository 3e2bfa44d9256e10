//! Schema compiler core.
//!
//! This crate turns a declarative field description into two artifacts:
//!
//! - a schema document ([`SchemaDocument`]) whose run-input component holds
//!   one [`SchemaProperty`] per field, built by [`compile_properties`] and
//!   [`assemble`];
//! - a typed model tree ([`ModelDescriptor`]) built by [`build_model`] and
//!   rendered as generated source by [`emit_source`].
//!
//! Generated source is read back with [`parse_source`], and request bodies
//! are checked against a model with [`validate_payload`]. [`compile`] runs
//! both paths over the same metadata.
//!
//! Nothing here touches the filesystem; see `field-schema-artifacts` for
//! loading metadata and writing artifacts.
//!
//! # Example
//!
//! ```
//! use field_schema_core::*;
//! use serde_json::json;
//!
//! let metadata = json!({
//!     "toto": {"type": "integer", "default": 1, "minimum": 0, "maximum": 10},
//!     "address": {
//!         "type": "object",
//!         "default": null,
//!         "properties": {"city": {"type": "string", "default": "NYC"}}
//!     }
//! });
//!
//! let artifacts = compile(&metadata, "InputsClass", &DocumentOptions::default()).unwrap();
//!
//! let address = artifacts.model.field("address").unwrap();
//! assert_eq!(address.type_repr(), "Option<Address>");
//!
//! let reloaded = parse_source(&artifacts.source).unwrap();
//! assert_eq!(reloaded, artifacts.model);
//!
//! let fields = validate_payload(&reloaded, &json!({"toto": 3})).unwrap();
//! assert_eq!(fields["address"], serde_json::Value::Null);
//! ```

mod compile;
mod document;
mod emit;
mod error;
mod model;
mod property;
mod source;
mod spec;
mod types;
mod validate;

pub use compile::{CompiledArtifacts, DEFAULT_MODEL_NAME, compile, compile_document, compile_models};
pub use document::{
    ComponentSchema, ComponentSchemas, Components, Content, DocumentOptions, Info, MediaType,
    OPENAPI_VERSION, Operation, PathItem, Paths, RUN_PATH, RequestBody, Response, Responses,
    SCHEMA_PATH, SchemaDocument, assemble,
};
pub use emit::{GENERATED_HEADER, emit_source};
pub use error::CompileError;
pub use model::build_model;
pub use property::{
    PropertyMap, SchemaFormat, SchemaProperty, SchemaType, compile_properties, compile_property,
};
pub use source::{SourceError, parse_source};
pub use spec::{FieldSpec, parse_metadata};
pub use types::*;
pub use validate::{PayloadError, describe_errors, validate_payload};
