use std::path::{Path, PathBuf};

use field_schema_artifacts::{
    ArtifactError, ArtifactKind, BuildConfig, BuildManifest, DataFormat, PublishTarget, WriteMode,
    load_metadata, load_source, manifest_dir, publish, run_build,
};
use field_schema_core::{DocumentOptions, FieldDefault, compile_document, validate_payload};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sample_metadata_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../metadata/all_variables.json")
}

fn write_yaml_metadata(dir: &Path) -> PathBuf {
    let path = dir.join("fields.yaml");
    std::fs::write(
        &path,
        "\
count:
  type: int
  default: 2.9
  minimum: 0
ratio:
  type: number
  default: 1
location:
  type: object
  properties:
    city:
      type: str
      default: Oslo
",
    )
    .unwrap();
    path
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn test_load_sample_metadata_keeps_file_order() {
    let metadata = load_metadata(sample_metadata_path()).unwrap();
    let keys: Vec<_> = metadata.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["toto", "titi", "label", "verbose", "tags", "address"]);
}

#[test]
fn test_yaml_metadata_compiles_with_coercion() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = load_metadata(write_yaml_metadata(dir.path())).unwrap();

    let document = compile_document(&metadata, &DocumentOptions::default()).unwrap();
    let properties = &document.component().properties;
    assert_eq!(properties.get("count").unwrap().default, Some(serde_json::json!(2)));
    assert_eq!(properties.get("ratio").unwrap().default, Some(serde_json::json!(1.0)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_metadata("/nonexistent/fields.json").unwrap_err();
    assert!(matches!(err, ArtifactError::Io(_)));
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

#[test]
fn test_publish_json_file_matches_memory_render() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = load_metadata(sample_metadata_path()).unwrap();
    let document = compile_document(&metadata, &DocumentOptions::default()).unwrap();

    let in_memory = publish(&document, &PublishTarget::Memory(DataFormat::Json)).unwrap();
    let path = dir.path().join("openapi.json");
    let written = publish(
        &document,
        &PublishTarget::File {
            path: path.clone(),
            format: DataFormat::Json,
        },
    )
    .unwrap();

    assert_eq!(in_memory, written);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), written);

    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(
        value["components"]["schemas"]["RunInput"]["properties"]["titi"]["default"],
        serde_json::json!(3.0)
    );
}

// ---------------------------------------------------------------------------
// Builds
// ---------------------------------------------------------------------------

#[test]
fn test_build_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write_yaml_metadata(dir.path());
    let config_path = dir.path().join("field-schema.yaml");
    std::fs::write(
        &config_path,
        "metadata: fields.yaml\nmodel_name: Job\noutputs:\n  schema_format: json\n  schema_document: openapi.json\n",
    )
    .unwrap();

    let config = BuildConfig::load(&config_path).unwrap();
    let out_dir = dir.path().join("build");
    let report = run_build(&config, &out_dir, WriteMode::Atomic).unwrap();

    assert_eq!(report.schema_document, out_dir.join("openapi.json"));
    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report.schema_document).unwrap()).unwrap();
    assert_eq!(document["openapi"], "3.1.0");

    let model = load_source(&report.generated_source).unwrap();
    assert_eq!(model.name, "Job");
    let location = model.field("location").unwrap();
    assert_eq!(location.default, FieldDefault::Required);
    assert_eq!(location.nested().unwrap().name, "Location");

    let manifest = BuildManifest::load(&report.manifest_path).unwrap();
    assert_eq!(manifest.model_name, "Job");
    assert!(manifest.get(ArtifactKind::GeneratedSource).is_some());
    assert!(!manifest.is_stale(&std::fs::read(dir.path().join("fields.yaml")).unwrap()));
    assert_eq!(manifest.metadata_path, PathBuf::from("../fields.yaml"));
    manifest.verify(manifest_dir(&report.manifest_path)).unwrap();
}

#[test]
fn test_verify_after_moving_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let built = dir.path().join("built");
    let report = run_build(
        &BuildConfig::new(sample_metadata_path()),
        &built,
        WriteMode::Atomic,
    )
    .unwrap();
    let manifest = BuildManifest::load(&report.manifest_path).unwrap();
    assert!(manifest.artifacts.iter().all(|entry| entry.path.is_relative()));

    let moved = dir.path().join("moved");
    std::fs::rename(&built, &moved).unwrap();
    manifest.verify(&moved).unwrap();
}

#[test]
fn test_rebuild_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let config = BuildConfig::new(sample_metadata_path());

    let first = run_build(&config, &dir.path().join("a"), WriteMode::Atomic).unwrap();
    let second = run_build(&config, &dir.path().join("b"), WriteMode::Atomic).unwrap();

    for (a, b) in [
        (&first.schema_document, &second.schema_document),
        (&first.generated_source, &second.generated_source),
    ] {
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }
}

#[test]
fn test_exclusive_build_refuses_existing_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = BuildConfig::new(sample_metadata_path());

    run_build(&config, dir.path(), WriteMode::Exclusive).unwrap();
    let err = run_build(&config, dir.path(), WriteMode::Exclusive).unwrap_err();
    assert!(
        matches!(err, ArtifactError::Io(ref e) if e.kind() == std::io::ErrorKind::AlreadyExists)
    );

    // Atomic mode replaces outputs.
    run_build(&config, dir.path(), WriteMode::Atomic).unwrap();
}

#[test]
fn test_verify_after_hand_edit_fails() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_build(
        &BuildConfig::new(sample_metadata_path()),
        dir.path(),
        WriteMode::Atomic,
    )
    .unwrap();

    let mut source = std::fs::read_to_string(&report.generated_source).unwrap();
    source.push_str("// tweaked\n");
    std::fs::write(&report.generated_source, source).unwrap();

    let err = BuildManifest::load(&report.manifest_path)
        .unwrap()
        .verify(dir.path())
        .unwrap_err();
    assert!(matches!(err, ArtifactError::ChecksumMismatch { .. }));
}

#[test]
fn test_loaded_source_validates_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_build(
        &BuildConfig::new(sample_metadata_path()),
        dir.path(),
        WriteMode::Atomic,
    )
    .unwrap();
    let model = load_source(&report.generated_source).unwrap();

    let fields = validate_payload(&model, &serde_json::json!({"address": {"zip": "10001"}})).unwrap();
    assert_eq!(fields["address"]["city"], "NYC");
    assert_eq!(fields["titi"], serde_json::json!(3.0));

    let errors =
        validate_payload(&model, &serde_json::json!({"address": {"zip": "12345678901"}})).unwrap_err();
    assert_eq!(errors[0].path, "address.zip");
}
