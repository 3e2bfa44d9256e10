//! Metadata and generated-source loading.
//!
//! Metadata files are JSON (`.json`) or YAML (`.yaml`, `.yml`). Both are
//! parsed into a `serde_json::Value` with object keys in file order, which
//! is the field order every compiled artifact follows.
//!
//! ```no_run
//! use field_schema_artifacts::load_metadata;
//!
//! let metadata = load_metadata("metadata/all_variables.json").unwrap();
//! assert!(metadata.is_object());
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use field_schema_core::{ModelDescriptor, parse_source};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ArtifactError, Result};

/// Text format of a metadata file or rendered schema document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Yaml,
    Json,
}

impl DataFormat {
    /// Infers the format from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::UnsupportedFormat`] for any other extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use field_schema_artifacts::DataFormat;
    ///
    /// assert_eq!(DataFormat::from_path("a/openapi.yml").unwrap(), DataFormat::Yaml);
    /// assert_eq!(DataFormat::from_path("meta.JSON").unwrap(), DataFormat::Json);
    /// assert!(DataFormat::from_path("meta.toml").is_err());
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(ArtifactError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}' (expected yaml or json)")),
        }
    }
}

/// Reads a metadata file, choosing the parser from its extension.
///
/// # Errors
///
/// Returns [`ArtifactError::UnsupportedFormat`] for unknown extensions,
/// [`ArtifactError::Io`] if the file cannot be read, and
/// [`ArtifactError::Json`] / [`ArtifactError::Yaml`] for parse failures.
pub fn load_metadata(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let format = DataFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    let metadata = parse_metadata_str(&text, format)?;
    debug!(path = %path.display(), %format, "Loaded metadata");
    Ok(metadata)
}

/// Parses metadata text in the given format.
///
/// # Examples
///
/// ```
/// use field_schema_artifacts::{DataFormat, parse_metadata_str};
///
/// let yaml = "b:\n  type: int\n  default: 1\na:\n  type: str\n  default: x\n";
/// let metadata = parse_metadata_str(yaml, DataFormat::Yaml).unwrap();
/// let keys: Vec<_> = metadata.as_object().unwrap().keys().collect();
/// assert_eq!(keys, vec!["b", "a"]);
/// ```
pub fn parse_metadata_str(text: &str, format: DataFormat) -> Result<Value> {
    let metadata = match format {
        DataFormat::Json => serde_json::from_str(text)?,
        DataFormat::Yaml => serde_yaml::from_str(text)?,
    };
    Ok(metadata)
}

/// Reads generated source back into its root model.
///
/// # Errors
///
/// Returns [`ArtifactError::Io`] if the file cannot be read, or
/// [`ArtifactError::Source`] if the text is not valid generated source.
pub fn load_source(path: impl AsRef<Path>) -> Result<ModelDescriptor> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let model = parse_source(&text)?;
    debug!(path = %path.display(), model = %model.name, "Loaded generated source");
    Ok(model)
}
