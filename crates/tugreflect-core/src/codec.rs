//! Metadata artifact encoding, decoding and storage.
//!
//! An artifact is a JSON envelope around one module's [`ModuleMetadata`]:
//!
//! ```json
//! {
//!   "format": "tugreflect-metadata",
//!   "schema_version": 1,
//!   "checksum": "<sha256 hex of the compact metadata encoding>",
//!   "metadata": { "module": "...", "packages": [...], "uses": {...}, "hierarchy": {...} }
//! }
//! ```
//!
//! Every collection in the metadata is ordered (`BTreeSet`/`BTreeMap` or an
//! insertion-ordered [`MatchSet`](crate::model::MatchSet)), so the same metadata
//! always encodes to the same bytes.
//!
//! Decoding never recovers: a wrong format tag, an unknown schema version, a
//! checksum mismatch or any JSON error is [`MetadataError::Corrupt`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::model::{ModuleMetadata, METADATA_SCHEMA_VERSION};

/// Format tag written into every artifact.
pub const METADATA_FORMAT: &str = "tugreflect-metadata";

/// Artifact file name inside the output directory.
pub const METADATA_FILE_NAME: &str = "tugreflect.meta.json";

/// Errors reading or writing metadata artifacts.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The artifact does not exist.
    #[error("metadata artifact not found: {}", path.display())]
    Missing { path: PathBuf },

    /// The artifact exists but cannot be trusted.
    #[error("metadata artifact {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    /// Serialization failed.
    #[error("failed to encode metadata: {0}")]
    Encode(#[source] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format: &'a str,
    schema_version: u32,
    checksum: String,
    metadata: &'a ModuleMetadata,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format: String,
    schema_version: u32,
}

#[derive(Deserialize)]
struct Artifact {
    checksum: String,
    metadata: ModuleMetadata,
}

// ============================================================================
// Encode / Decode
// ============================================================================

/// SHA-256 hex digest of the compact metadata encoding.
pub fn checksum(metadata: &ModuleMetadata) -> Result<String, MetadataError> {
    let payload = serde_json::to_vec(metadata).map_err(MetadataError::Encode)?;
    Ok(hex::encode(Sha256::digest(&payload)))
}

/// Encode metadata as artifact bytes.
pub fn encode(metadata: &ModuleMetadata) -> Result<Vec<u8>, MetadataError> {
    let artifact = ArtifactRef {
        format: METADATA_FORMAT,
        schema_version: METADATA_SCHEMA_VERSION,
        checksum: checksum(metadata)?,
        metadata,
    };
    let mut bytes = serde_json::to_vec_pretty(&artifact).map_err(MetadataError::Encode)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode artifact bytes held in memory.
pub fn decode(bytes: &[u8]) -> Result<ModuleMetadata, MetadataError> {
    decode_from(bytes, "<memory>")
}

/// Decode artifact bytes, naming `origin` in errors.
pub fn decode_from(bytes: &[u8], origin: &str) -> Result<ModuleMetadata, MetadataError> {
    let corrupt = |reason: String| MetadataError::Corrupt {
        path: origin.to_string(),
        reason,
    };

    let header: ArtifactHeader =
        serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
    if header.format != METADATA_FORMAT {
        return Err(corrupt(format!("unexpected format '{}'", header.format)));
    }
    if header.schema_version != METADATA_SCHEMA_VERSION {
        return Err(corrupt(format!(
            "unsupported schema version {} (expected {})",
            header.schema_version, METADATA_SCHEMA_VERSION
        )));
    }

    let artifact: Artifact = serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
    let actual = checksum(&artifact.metadata)?;
    if actual != artifact.checksum {
        return Err(corrupt(format!(
            "checksum mismatch (recorded {}, computed {})",
            artifact.checksum, actual
        )));
    }
    Ok(artifact.metadata)
}

// ============================================================================
// Storage
// ============================================================================

/// Path of the artifact inside an output directory.
pub fn artifact_path(output_dir: &Path) -> PathBuf {
    output_dir.join(METADATA_FILE_NAME)
}

/// Read and decode an artifact file.
pub fn read_artifact(path: &Path) -> Result<ModuleMetadata, MetadataError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MetadataError::Missing {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(MetadataError::Io(e)),
    };
    let metadata = decode_from(&bytes, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        module = %metadata.module,
        entries = metadata.uses.len(),
        "read metadata artifact"
    );
    Ok(metadata)
}

/// Encode and write an artifact into `output_dir`, returning its path.
pub fn write_artifact(output_dir: &Path, metadata: &ModuleMetadata) -> Result<PathBuf, MetadataError> {
    let bytes = encode(metadata)?;
    fs::create_dir_all(output_dir)?;
    let path = artifact_path(output_dir);
    atomic_write(&path, &bytes)?;
    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        "wrote metadata artifact"
    );
    Ok(path)
}

/// Write content to a file atomically using temp + rename.
///
/// Readers see either the old or the new artifact, never a partial one. The
/// temp name carries PID and timestamp so concurrent writers do not collide.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let pid = std::process::id();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        pid,
        timestamp
    ));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
