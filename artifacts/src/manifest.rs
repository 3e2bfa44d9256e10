//! Build manifest for tracking generated artifacts.
//!
//! The manifest is written next to the artifacts at the end of a build. It
//! records the SHA-256 checksum of the metadata input and of every artifact,
//! so later runs can tell whether an artifact was edited by hand or the
//! metadata changed since the build.
//!
//! Stored paths are relative to the directory holding the manifest, so a
//! manifest can be verified from any working directory and the output
//! directory can be moved as a whole.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//!
//! use field_schema_artifacts::{ArtifactKind, BuildManifest, manifest_dir};
//!
//! let manifest_path = Path::new("build/build-manifest.json");
//! let base = manifest_dir(manifest_path);
//!
//! let mut manifest = BuildManifest::new("InputsClass", "../metadata/all_variables.json");
//! manifest.record(ArtifactKind::SchemaDocument, base, "build/openapi.yaml").unwrap();
//! manifest.save(manifest_path).unwrap();
//!
//! let loaded = BuildManifest::load(manifest_path).unwrap();
//! loaded.verify(base).unwrap();
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::Utc;
use field_schema_core::SOURCE_FORMAT_VERSION;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ArtifactError, Result};

/// Manifest format version.
pub const MANIFEST_VERSION: &str = "1.0";

/// What an artifact entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    SchemaDocument,
    GeneratedSource,
}

/// One written artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub kind: ArtifactKind,
    /// Relative to the manifest's directory.
    pub path: PathBuf,
    /// SHA-256 hex digest of the file as written.
    pub checksum: String,
    pub size_bytes: u64,
}

/// Top-level build manifest, persisted as pretty-printed JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Manifest format version.
    pub version: String,
    /// Generated-source format the build emitted.
    pub source_format: String,
    /// Version of the tool that produced the manifest.
    pub tool_version: String,
    pub model_name: String,
    /// Metadata input, relative to the manifest's directory.
    pub metadata_path: PathBuf,
    /// SHA-256 of the metadata input, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_checksum: Option<String>,
    /// RFC 3339 timestamp of the build.
    pub built_at: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl BuildManifest {
    /// Creates an empty manifest stamped with the current time.
    pub fn new(model_name: &str, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            source_format: SOURCE_FORMAT_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            model_name: model_name.to_string(),
            metadata_path: metadata_path.into(),
            metadata_checksum: None,
            built_at: Utc::now().to_rfc3339(),
            artifacts: Vec::new(),
        }
    }

    /// Loads a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ArtifactError::Io) if the file cannot be read,
    /// or [`Json`](crate::ArtifactError::Json) if the content is not valid
    /// manifest JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let manifest = serde_json::from_reader(reader)?;
        Ok(manifest)
    }

    /// Saves the manifest as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ArtifactError::Io) if the file cannot be
    /// written, or [`Json`](crate::ArtifactError::Json) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Renders the manifest as pretty-printed JSON text.
    pub fn to_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Records the checksum of the metadata input.
    pub fn record_metadata(&mut self, bytes: &[u8]) {
        self.metadata_checksum = Some(checksum_bytes(bytes));
    }

    /// Checksums the file at `path` and records it relative to `base_dir`,
    /// replacing any entry for the same path.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ArtifactError::Io) if the file cannot be read or
    /// either path cannot be resolved.
    pub fn record(
        &mut self,
        kind: ArtifactKind,
        base_dir: &Path,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let entry = ArtifactEntry {
            kind,
            path: relative_path(path, base_dir)?,
            checksum: checksum_bytes(&bytes),
            size_bytes: bytes.len() as u64,
        };

        match self.artifacts.iter_mut().find(|e| e.path == entry.path) {
            Some(existing) => *existing = entry,
            None => self.artifacts.push(entry),
        }
        Ok(())
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&ArtifactEntry> {
        self.artifacts.iter().find(|e| e.kind == kind)
    }

    /// Metadata input resolved against `base_dir`.
    pub fn metadata_file(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.metadata_path)
    }

    /// Re-checksums every recorded artifact, resolving entries against
    /// `base_dir` (the manifest's directory).
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumMismatch`](crate::ArtifactError::ChecksumMismatch)
    /// for the first artifact whose content changed, or
    /// [`Io`](crate::ArtifactError::Io) if one cannot be read.
    pub fn verify(&self, base_dir: &Path) -> Result<()> {
        for entry in &self.artifacts {
            let path = base_dir.join(&entry.path);
            let actual = calculate_checksum(&path)?;
            if actual != entry.checksum {
                return Err(ArtifactError::ChecksumMismatch {
                    path,
                    expected: entry.checksum.clone(),
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Returns `true` if the metadata file no longer matches the recorded
    /// checksum. A manifest without a metadata checksum is always stale.
    pub fn is_stale(&self, metadata_bytes: &[u8]) -> bool {
        self.metadata_checksum.as_deref() != Some(checksum_bytes(metadata_bytes).as_str())
    }
}

/// Directory a manifest's stored paths are relative to.
pub fn manifest_dir(manifest_path: &Path) -> &Path {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Expresses `path` relative to `base`. Both must exist.
///
/// Falls back to the absolute path when the two share no root.
///
/// # Errors
///
/// Returns [`Io`](crate::ArtifactError::Io) if either path cannot be
/// canonicalized.
pub fn relative_path(path: &Path, base: &Path) -> Result<PathBuf> {
    let path = std::fs::canonicalize(path)?;
    let base = std::fs::canonicalize(base)?;
    if path.components().next() != base.components().next() {
        return Ok(path);
    }

    let mut path_parts = path.components().peekable();
    let mut base_parts = base.components().peekable();
    while let (Some(a), Some(b)) = (path_parts.peek(), base_parts.peek()) {
        if a != b {
            break;
        }
        path_parts.next();
        base_parts.next();
    }

    let mut relative: PathBuf = base_parts.map(|_| "..").collect();
    relative.extend(path_parts);
    Ok(relative)
}

/// Computes the SHA-256 hex digest of a file.
///
/// # Errors
///
/// Returns [`Io`](crate::ArtifactError::Io) if the file cannot be read.
pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(checksum_bytes(&bytes))
}

/// Computes the SHA-256 hex digest of `bytes`.
///
/// # Examples
///
/// ```
/// use field_schema_artifacts::checksum_bytes;
///
/// assert_eq!(
///     checksum_bytes(b"abc"),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
pub fn checksum_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
