//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** Every response has `status` as first field (`"ok"` or `"error"`)
//! 2. **Deterministic:** Same input -> same output (field order, array ordering)
//! 3. **Nullable vs absent:** Absent field means "not applicable"
//! 4. **Versioned:** Schema version in response enables forward compatibility
//!
//! The response schema version is independent of the metadata artifact's schema.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::engine::{Resolution, ResolvedSite};
use crate::error::{EngineError, OutputErrorCode};
use crate::model::{DeclarationSummary, MatchSet, ModuleMetadata, Query, Uses};
use crate::scanner::ScannedModule;
use crate::types::FileId;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (see `OutputErrorCode`).
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from an EngineError.
    pub fn from_error(err: &EngineError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let details = match err {
            EngineError::InvalidArguments { details, .. } => details.clone(),
            EngineError::MetadataMissing { path } => Some(serde_json::json!({ "path": path })),
            EngineError::MetadataCorrupt { path, reason } => {
                Some(serde_json::json!({ "path": path, "reason": reason }))
            }
            EngineError::InternalError { .. } => None,
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from an EngineError.
    pub fn from_error(err: &EngineError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Response Structs
// ============================================================================

/// Response for the resolve command.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Resolved module name.
    pub module: String,
    /// Packages the module declares.
    pub packages: Vec<String>,
    /// Call-sites with their matches (ordered by file, then line, then col).
    pub sites: Vec<ResolvedSite>,
    /// Merged index: local uses first, then dependencies.
    pub index: Uses,
    /// Recoverable problems found during the pass (may be empty).
    pub diagnostics: Vec<Diagnostic>,
    /// Written metadata artifact, when metadata was saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl ResolveResponse {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        ResolveResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            module: resolution.module().to_string(),
            packages: resolution.metadata.packages.iter().cloned().collect(),
            sites: resolution.sites.clone(),
            index: resolution.index.uses().clone(),
            diagnostics: resolution.diagnostics.iter().cloned().collect(),
            artifact: resolution
                .artifact
                .as_ref()
                .map(|path| path.display().to_string()),
        }
    }
}

/// Declarations of one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileDeclarations {
    pub file: FileId,
    pub declarations: Vec<DeclarationSummary>,
}

/// Response for the scan command.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub module: String,
    pub packages: Vec<String>,
    /// Summaries per file, files in lexicographic order.
    pub files: Vec<FileDeclarations>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ScanResponse {
    pub fn new(module: impl Into<String>, scanned: &ScannedModule, diagnostics: &Diagnostics) -> Self {
        ScanResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            module: module.into(),
            packages: scanned.packages().iter().cloned().collect(),
            files: scanned
                .files()
                .iter()
                .map(|(file, declarations)| FileDeclarations {
                    file: file.clone(),
                    declarations: declarations.clone(),
                })
                .collect(),
            diagnostics: diagnostics.iter().cloned().collect(),
        }
    }
}

/// Response for the inspect command.
#[derive(Debug, Clone, Serialize)]
pub struct InspectResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Artifact that was decoded.
    pub path: String,
    pub metadata: ModuleMetadata,
}

impl InspectResponse {
    pub fn new(path: impl Into<String>, metadata: ModuleMetadata) -> Self {
        InspectResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            path: path.into(),
            metadata,
        }
    }
}

/// Response for the query command.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub module: String,
    /// The chain as given.
    pub expr: String,
    /// Parsed query.
    pub query: Query,
    pub matches: MatchSet,
    /// Scan diagnostics of the module.
    pub diagnostics: Vec<Diagnostic>,
}

impl QueryResponse {
    pub fn new(
        module: impl Into<String>,
        expr: impl Into<String>,
        query: Query,
        matches: MatchSet,
        diagnostics: &Diagnostics,
    ) -> Self {
        QueryResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            module: module.into(),
            expr: expr.into(),
            query,
            matches,
            diagnostics: diagnostics.iter().cloned().collect(),
        }
    }
}

// ============================================================================
// Emit
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
