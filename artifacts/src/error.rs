//! Error types for artifact operations.
//!
//! Covers reading metadata, compiling it, writing artifacts, and verifying
//! them against a build manifest.

use std::path::PathBuf;

use field_schema_core::{CompileError, SourceError};
use thiserror::Error;

/// Errors that can occur while loading, building or verifying artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Metadata could not be compiled.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// Generated source could not be loaded.
    #[error("generated source error: {0}")]
    Source(#[from] SourceError),

    /// The file extension does not name a supported format.
    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// An artifact no longer matches the checksum recorded at build time.
    #[error("checksum mismatch for {}: expected {expected}, found {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// Convenience alias for results with [`ArtifactError`].
pub type Result<T> = std::result::Result<T, ArtifactError>;
