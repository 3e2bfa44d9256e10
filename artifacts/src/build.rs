//! End-to-end builds driven by a [`BuildConfig`].
//!
//! A build loads the metadata, compiles both artifacts and renders the
//! schema document before anything is written. A compile failure therefore
//! leaves the output directory untouched.

use std::path::{Path, PathBuf};

use field_schema_core::compile;
use tracing::info;

use crate::config::BuildConfig;
use crate::error::Result;
use crate::loader::{DataFormat, parse_metadata_str};
use crate::manifest::{ArtifactKind, BuildManifest, manifest_dir, relative_path};
use crate::publish::{WriteMode, render_document, write_artifact};

/// Paths written by a successful build, plus the manifest describing them.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub schema_document: PathBuf,
    pub generated_source: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: BuildManifest,
}

/// Runs a build, writing every artifact under `out_dir`.
///
/// # Errors
///
/// Returns [`Compile`](crate::ArtifactError::Compile) if the metadata does
/// not compile (nothing is written in that case), and I/O or serialization
/// errors otherwise.
pub fn run_build(config: &BuildConfig, out_dir: &Path, mode: WriteMode) -> Result<BuildReport> {
    let format = DataFormat::from_path(&config.metadata)?;
    let metadata_text = std::fs::read_to_string(&config.metadata)?;
    let metadata = parse_metadata_str(&metadata_text, format)?;

    let artifacts = compile(&metadata, &config.model_name, &config.document)?;
    let document_text = render_document(&artifacts.document, config.outputs.schema_format)?;

    let schema_document = config.schema_document_path(out_dir);
    let generated_source = config.generated_source_path(out_dir);
    let manifest_path = config.manifest_path(out_dir);

    write_artifact(&schema_document, document_text.as_bytes(), mode)?;
    write_artifact(&generated_source, artifacts.source.as_bytes(), mode)?;

    let base_dir = manifest_dir(&manifest_path);
    std::fs::create_dir_all(base_dir)?;
    let mut manifest = BuildManifest::new(
        &config.model_name,
        relative_path(&config.metadata, base_dir)?,
    );
    manifest.record_metadata(metadata_text.as_bytes());
    manifest.record(ArtifactKind::SchemaDocument, base_dir, &schema_document)?;
    manifest.record(ArtifactKind::GeneratedSource, base_dir, &generated_source)?;
    write_artifact(&manifest_path, manifest.to_json()?.as_bytes(), mode)?;

    info!(
        model = %artifacts.model.name,
        fields = artifacts.model.fields.len(),
        out_dir = %out_dir.display(),
        "Build complete"
    );
    Ok(BuildReport {
        schema_document,
        generated_source,
        manifest_path,
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArtifactError;

    #[test]
    fn test_compile_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = dir.path().join("meta.json");
        std::fs::write(&metadata, r#"{"toto": {"type": "integer"}}"#).unwrap();

        let out_dir = dir.path().join("out");
        let err = run_build(&BuildConfig::new(&metadata), &out_dir, WriteMode::Atomic).unwrap_err();

        assert!(matches!(err, ArtifactError::Compile(_)));
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_build_records_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = dir.path().join("meta.yaml");
        std::fs::write(&metadata, "toto:\n  type: integer\n  default: 1\n").unwrap();

        let report = run_build(&BuildConfig::new(&metadata), dir.path(), WriteMode::Atomic).unwrap();

        assert_eq!(report.manifest.artifacts.len(), 2);
        assert!(report.schema_document.ends_with("openapi.yaml"));
        assert!(report.generated_source.ends_with("generated_models.fsm"));
        assert_eq!(BuildManifest::load(&report.manifest_path).unwrap(), report.manifest);
        report.manifest.verify(dir.path()).unwrap();
    }

    #[test]
    fn test_manifest_paths_are_relative_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = dir.path().join("meta.json");
        std::fs::write(&metadata, r#"{"toto": {"type": "integer", "default": 1}}"#).unwrap();

        let mut config = BuildConfig::new(&metadata);
        config.outputs.manifest = "meta/build-manifest.json".into();
        let out_dir = dir.path().join("out");
        let report = run_build(&config, &out_dir, WriteMode::Atomic).unwrap();

        let manifest = &report.manifest;
        assert_eq!(manifest.metadata_path, std::path::PathBuf::from("../../meta.json"));
        let source = manifest.get(ArtifactKind::GeneratedSource).unwrap();
        assert_eq!(source.path, std::path::PathBuf::from("../generated_models.fsm"));

        let base = manifest_dir(&report.manifest_path);
        manifest.verify(base).unwrap();
        let metadata_bytes = std::fs::read(manifest.metadata_file(base)).unwrap();
        assert!(!manifest.is_stale(&metadata_bytes));
    }
}
