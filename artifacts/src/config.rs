//! Build configuration.
//!
//! A build config names the metadata input, the root model, the document
//! options and where each artifact is written. Everything except
//! `metadata` has a default.
//!
//! # Example YAML
//!
//! ```yaml
//! metadata: metadata/all_variables.json
//! model_name: InputsClass
//! document:
//!   title: field-schema
//!   version: 1.0.0
//!   component_name: RunInput
//! outputs:
//!   schema_document: openapi.yaml
//!   schema_format: yaml
//!   generated_source: generated_models.fsm
//!   manifest: build-manifest.json
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use field_schema_core::{DEFAULT_MODEL_NAME, DocumentOptions};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::loader::DataFormat;

/// Output file locations.
///
/// Relative paths are relative to the output directory of the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub schema_document: PathBuf,
    pub schema_format: DataFormat,
    pub generated_source: PathBuf,
    pub manifest: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            schema_document: PathBuf::from("openapi.yaml"),
            schema_format: DataFormat::Yaml,
            generated_source: PathBuf::from("generated_models.fsm"),
            manifest: PathBuf::from("build-manifest.json"),
        }
    }
}

/// Top-level build configuration.
///
/// # Examples
///
/// ```
/// use field_schema_artifacts::BuildConfig;
///
/// let config: BuildConfig = serde_yaml::from_str("metadata: fields.yaml\n").unwrap();
/// assert_eq!(config.model_name, "InputsClass");
/// assert_eq!(config.document.component_name, "RunInput");
/// assert_eq!(config.outputs.manifest.to_str(), Some("build-manifest.json"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Metadata file (JSON or YAML).
    pub metadata: PathBuf,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default)]
    pub document: DocumentOptions,
    #[serde(default)]
    pub outputs: OutputConfig,
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

impl BuildConfig {
    /// Creates a config with default settings for `metadata`.
    pub fn new(metadata: impl Into<PathBuf>) -> Self {
        Self {
            metadata: metadata.into(),
            model_name: default_model_name(),
            document: DocumentOptions::default(),
            outputs: OutputConfig::default(),
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// A relative `metadata` path is resolved against the directory holding
    /// the config file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ArtifactError::Io) if the file cannot be read,
    /// or [`Yaml`](crate::ArtifactError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: Self = serde_yaml::from_reader(reader)?;
        if let Some(base) = path.parent() {
            config.metadata = resolve(base, &config.metadata);
        }
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ArtifactError::Io) if the file cannot be
    /// written, or [`Yaml`](crate::ArtifactError::Yaml) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn schema_document_path(&self, out_dir: &Path) -> PathBuf {
        resolve(out_dir, &self.outputs.schema_document)
    }

    pub fn generated_source_path(&self, out_dir: &Path) -> PathBuf {
        resolve(out_dir, &self.outputs.generated_source)
    }

    pub fn manifest_path(&self, out_dir: &Path) -> PathBuf {
        resolve(out_dir, &self.outputs.manifest)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
metadata: metadata/all_variables.json
model_name: Inputs
document:
  title: demo
  version: 2.0.0
  component_name: DemoInput
outputs:
  schema_document: schema/openapi.json
  schema_format: json
  generated_source: models.fsm
  manifest: manifest.json
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: BuildConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.model_name, "Inputs");
        assert_eq!(config.document.title, "demo");
        assert_eq!(config.document.version, "2.0.0");
        assert_eq!(config.document.component_name, "DemoInput");
        assert_eq!(config.outputs.schema_format, DataFormat::Json);
        assert_eq!(config.outputs.generated_source, PathBuf::from("models.fsm"));
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let yaml = "metadata: m.json\ndocument:\n  title: demo\noutputs:\n  manifest: m.json\n";
        let config: BuildConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.document.title, "demo");
        assert_eq!(config.document.version, "1.0.0");
        assert_eq!(config.outputs.schema_document, PathBuf::from("openapi.yaml"));
        assert_eq!(config.outputs.schema_format, DataFormat::Yaml);
    }

    #[test]
    fn test_missing_metadata_is_an_error() {
        assert!(serde_yaml::from_str::<BuildConfig>("model_name: X\n").is_err());
    }

    #[test]
    fn test_output_paths_resolve_against_out_dir() {
        let mut config = BuildConfig::new("m.json");
        config.outputs.manifest = PathBuf::from("/abs/manifest.json");

        let out = Path::new("build");
        assert_eq!(config.schema_document_path(out), PathBuf::from("build/openapi.yaml"));
        assert_eq!(config.manifest_path(out), PathBuf::from("/abs/manifest.json"));
    }

    #[test]
    fn test_load_resolves_metadata_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.yaml");

        let original: BuildConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = BuildConfig::load(&path).unwrap();
        assert_eq!(loaded.metadata, dir.path().join("metadata/all_variables.json"));
        assert_eq!(loaded.document, original.document);
        assert_eq!(loaded.outputs, original.outputs);
    }
}
