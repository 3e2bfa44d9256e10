//! Compilation errors.
//!
//! Every variant is fatal to the whole compilation run: no partial schema
//! property, model descriptor or source text is produced once one of these
//! is returned.

use thiserror::Error;

/// Errors raised while compiling field metadata.
///
/// Field paths are dotted from the top-level mapping (e.g. `address.city`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A leaf field spec has no `default` key.
    #[error("leaf field `{field}` must declare a `default` (null is allowed)")]
    MissingDefault { field: String },

    /// A declared default cannot be converted to the field's primitive kind.
    #[error("cannot coerce default {value} of field `{field}` to {kind}: {reason}")]
    Coercion {
        field: String,
        kind: String,
        value: String,
        reason: String,
    },

    /// A nested object reuses the model name of one of its ancestors.
    #[error("nested object cycle detected at path: {path}")]
    CyclicSchema { path: String },

    /// An entry does not have the shape of a field spec.
    #[error("invalid field spec `{field}`: {reason}")]
    InvalidFieldSpec { field: String, reason: String },
}

impl CompileError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFieldSpec {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
