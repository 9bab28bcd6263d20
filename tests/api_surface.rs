//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Model
// ============================================================================

// types module - file identity and source locations
use tugreflect::types::{FileId, Location};

// model module - queries, filters, summaries, metadata
use tugreflect::model::{
    DeclarationSummary, Filter, FilterMatches, FunctionOwner, Kind, MatchSet, ModuleMetadata,
    Name, Query, Shape, Signature, SignatureFilter, SupertypeFilter, TypeArg, TypeRef, Uses,
    Variance, METADATA_SCHEMA_VERSION, UNIT_TYPE,
};

// tree module - declaration tree consumed from the frontend
use tugreflect::tree::{
    CallArg, CallChain, CallSegment, Decl, ModuleTree, SourceFile, TreeError, TypeNode,
};

// ============================================================================
// Pipeline
// ============================================================================

use tugreflect::chain::{parse_call_chain, parse_type, ChainError};
use tugreflect::codec::{
    artifact_path, checksum, decode, decode_from, encode, read_artifact, write_artifact,
    MetadataError, METADATA_FILE_NAME, METADATA_FORMAT,
};
use tugreflect::config::{
    AnnotationMatch, CliOverrides, ClosureMode, ConfigError, ConfigSource, ConfigValue,
    EngineConfig, ResolvedConfig, CONFIG_FILE_NAME,
};
use tugreflect::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use tugreflect::engine::{Engine, ModuleAnalysis, Resolution, ResolvedSite};
use tugreflect::extractor::{
    extract_queries, parse_query, CallSiteQuery, ExtractedQueries, QueryParseError,
    QueryParseErrorKind,
};
use tugreflect::hierarchy::TypeHierarchy;
use tugreflect::matcher::{annotations_match, match_candidates, matches, Matcher};
use tugreflect::merge::{merge, MergedIndex};
use tugreflect::scanner::{scan_module, ScannedModule, Scanner};

// ============================================================================
// Errors and Output
// ============================================================================

use tugreflect::error::{EngineError, OutputErrorCode};
use tugreflect::output::{
    emit_response, ErrorInfo, ErrorResponse, FileDeclarations,
    InspectResponse, QueryResponse, ResolveResponse, ScanResponse, SCHEMA_VERSION,
};

// ============================================================================
// Front Door
// ============================================================================

use tugreflect::cli::{run_inspect, run_query, run_resolve, run_scan};

// ============================================================================
// Test
// ============================================================================

#[test]
fn api_surface_compiles() {
    // The imports above form the public API contract.
    let _ = std::any::type_name::<Filter>();
    let _ = std::any::type_name::<ModuleMetadata>();
    let _ = std::any::type_name::<Engine<'static>>();
    let _ = std::any::type_name::<MergedIndex>();
    let _ = std::any::type_name::<EngineError>();
    let _ = std::any::type_name::<ModuleTree>();
}

#[test]
fn schema_version_is_stable() {
    // The schema version is part of the public API contract
    assert_eq!(SCHEMA_VERSION, "1");
    assert_eq!(METADATA_SCHEMA_VERSION, 1);
}
