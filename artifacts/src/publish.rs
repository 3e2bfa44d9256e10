//! Schema publishing and artifact writing.
//!
//! Rendering and writing are separate steps: [`render_document`] never
//! touches disk, and [`publish`] only writes when given a
//! [`PublishTarget::File`].
//!
//! Writes go through [`write_artifact`]. In [`WriteMode::Atomic`] the content
//! is written to a temporary file in the destination directory and renamed
//! into place, so a reader sees either the old artifact or the complete new
//! one. [`WriteMode::Exclusive`] refuses to replace an existing file, which
//! makes a concurrent second build fail instead of clobbering the first.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use field_schema_core::SchemaDocument;
use tracing::info;

use crate::error::Result;
use crate::loader::DataFormat;

/// Where a schema document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    /// Render only; [`publish`] returns the text.
    Memory(DataFormat),
    /// Render and write to `path`.
    File { path: PathBuf, format: DataFormat },
}

impl PublishTarget {
    pub fn format(&self) -> DataFormat {
        match self {
            Self::Memory(format) | Self::File { format, .. } => *format,
        }
    }
}

/// How an artifact file is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Temporary file plus rename; replaces any existing file.
    #[default]
    Atomic,
    /// Fail if the file already exists.
    Exclusive,
}

/// Renders a document as YAML or pretty JSON.
///
/// Key order follows the document structure, so rendering the same
/// document twice yields identical text.
///
/// # Examples
///
/// ```
/// use field_schema_artifacts::{DataFormat, render_document};
/// use field_schema_core::*;
///
/// let document = assemble(PropertyMap::new(), &DocumentOptions::default());
/// let yaml = render_document(&document, DataFormat::Yaml).unwrap();
/// assert!(yaml.starts_with("openapi: 3.1.0\n"));
///
/// let json = render_document(&document, DataFormat::Json).unwrap();
/// assert!(json.starts_with("{\n  \"openapi\": \"3.1.0\""));
/// ```
pub fn render_document(document: &SchemaDocument, format: DataFormat) -> Result<String> {
    let text = match format {
        DataFormat::Yaml => serde_yaml::to_string(document)?,
        DataFormat::Json => {
            let mut text = serde_json::to_string_pretty(document)?;
            text.push('\n');
            text
        }
    };
    Ok(text)
}

/// Renders `document` and, for a file target, writes it atomically.
///
/// Returns the rendered text in both cases.
///
/// # Errors
///
/// Returns a serialization error if rendering fails, or
/// [`ArtifactError::Io`](crate::ArtifactError::Io) if the file cannot be
/// written.
pub fn publish(document: &SchemaDocument, target: &PublishTarget) -> Result<String> {
    let text = render_document(document, target.format())?;
    if let PublishTarget::File { path, .. } = target {
        write_artifact(path, text.as_bytes(), WriteMode::Atomic)?;
    }
    Ok(text)
}

/// Writes `contents` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ArtifactError::Io`](crate::ArtifactError::Io) on any failure,
/// including `AlreadyExists` in [`WriteMode::Exclusive`].
pub fn write_artifact(path: &Path, contents: &[u8], mode: WriteMode) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    match mode {
        WriteMode::Atomic => {
            let mut file = temp_file_builder().tempfile_in(parent)?;
            file.write_all(contents)?;
            file.as_file().sync_all()?;
            file.persist(path).map_err(|e| e.error)?;
        }
        WriteMode::Exclusive => {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)?;
            file.write_all(contents)?;
            file.sync_all()?;
        }
    }

    info!(path = %path.display(), bytes = contents.len(), ?mode, "Wrote artifact");
    Ok(())
}

/// Temp files default to owner-only access; request the same umask-filtered
/// mode a plain create would get.
fn temp_file_builder() -> tempfile::Builder<'static, 'static> {
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder
}
