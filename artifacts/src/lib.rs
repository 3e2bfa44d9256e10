//! File handling for field-schema builds.
//!
//! This crate wraps the pure compiler in `field-schema-core` with the I/O a
//! build needs: loading metadata from JSON or YAML, rendering and writing
//! the schema document and generated source, reading a YAML build config,
//! and tracking written artifacts in a checksummed manifest.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use field_schema_artifacts::{BuildConfig, BuildManifest, WriteMode, manifest_dir, run_build};
//!
//! // Compile and write every artifact
//! let config = BuildConfig::load("field-schema.yaml").unwrap();
//! let report = run_build(&config, Path::new("build"), WriteMode::Atomic).unwrap();
//!
//! // Later: check nothing was edited by hand
//! let manifest = BuildManifest::load(&report.manifest_path).unwrap();
//! manifest.verify(manifest_dir(&report.manifest_path)).unwrap();
//! ```

mod build;
mod config;
mod error;
mod loader;
mod manifest;
mod publish;

pub use build::{BuildReport, run_build};
pub use config::{BuildConfig, OutputConfig};
pub use error::{ArtifactError, Result};
pub use loader::{DataFormat, load_metadata, load_source, parse_metadata_str};
pub use manifest::{
    ArtifactEntry, ArtifactKind, BuildManifest, MANIFEST_VERSION, calculate_checksum,
    checksum_bytes, manifest_dir, relative_path,
};
pub use publish::{PublishTarget, WriteMode, publish, render_document, write_artifact};
