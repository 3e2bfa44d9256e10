//! Whole-run compilation.
//!
//! Both outputs are derived from the same parsed metadata and produced
//! entirely in memory. Callers get all artifacts or an error, never a
//! subset.

use serde_json::Value;
use tracing::debug;

use crate::document::{DocumentOptions, SchemaDocument, assemble};
use crate::emit::emit_source;
use crate::error::CompileError;
use crate::model::build_model;
use crate::property::compile_properties;
use crate::spec::parse_metadata;
use crate::types::ModelDescriptor;

/// Root model name used when none is given.
pub const DEFAULT_MODEL_NAME: &str = "InputsClass";

/// Everything one compilation run produces.
#[derive(Debug, Clone)]
pub struct CompiledArtifacts {
    pub document: SchemaDocument,
    pub model: ModelDescriptor,
    /// Generated source text for `model`.
    pub source: String,
}

/// Compiles raw metadata into the schema document, the model tree and its
/// generated source.
///
/// # Errors
///
/// Returns the first [`CompileError`] hit on either path.
///
/// # Examples
///
/// ```
/// use field_schema_core::*;
/// use serde_json::json;
///
/// let metadata = json!({"toto": {"type": "integer", "default": 1}});
/// let artifacts = compile(&metadata, DEFAULT_MODEL_NAME, &DocumentOptions::default()).unwrap();
///
/// assert_eq!(artifacts.model.name, "InputsClass");
/// assert!(artifacts.document.component().properties.get("toto").is_some());
/// assert!(artifacts.source.contains("model InputsClass {"));
///
/// let missing = json!({"toto": {"type": "integer"}});
/// assert!(compile(&missing, DEFAULT_MODEL_NAME, &DocumentOptions::default()).is_err());
/// ```
pub fn compile(
    metadata: &Value,
    model_name: &str,
    options: &DocumentOptions,
) -> Result<CompiledArtifacts, CompileError> {
    let specs = parse_metadata(metadata)?;
    let document = assemble(compile_properties(&specs)?, options);
    let model = build_model(&specs, model_name)?;
    let source = emit_source(&model);

    debug!(
        fields = specs.len(),
        model = %model.name,
        source_bytes = source.len(),
        "Compiled metadata"
    );
    Ok(CompiledArtifacts {
        document,
        model,
        source,
    })
}

/// Runs only the schema path.
///
/// The model tree is still built and discarded, so metadata the model path
/// rejects (missing leaf default, cycle, bad identifier) never yields a
/// schema document either.
pub fn compile_document(
    metadata: &Value,
    options: &DocumentOptions,
) -> Result<SchemaDocument, CompileError> {
    let specs = parse_metadata(metadata)?;
    let properties = compile_properties(&specs)?;
    build_model(&specs, DEFAULT_MODEL_NAME)?;
    Ok(assemble(properties, options))
}

/// Runs only the model path, returning the descriptor and its source.
pub fn compile_models(
    metadata: &Value,
    model_name: &str,
) -> Result<(ModelDescriptor, String), CompileError> {
    let specs = parse_metadata(metadata)?;
    let model = build_model(&specs, model_name)?;
    let source = emit_source(&model);
    Ok((model, source))
}
