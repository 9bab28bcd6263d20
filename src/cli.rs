//! CLI command bodies.
//!
//! Each `run_*` function performs one command and returns the JSON response
//! text. The caller (typically `main.rs`) resolves configuration and prints
//! the result; errors are returned as `EngineError` so the caller can emit an
//! `ErrorResponse` with the matching exit code.
//!
//! - `run_resolve` - full resolution pass for one module
//! - `run_scan` - declaration summaries only
//! - `run_inspect` - decode a metadata artifact
//! - `run_query` - resolve a single textual chain against a module
//!
//! A disabled engine reads no dependency artifacts: `run_scan` reports no
//! declarations and `run_query` validates the chain but reports no matches.

use std::path::Path;

use serde::Serialize;

use tugreflect_core::chain::parse_call_chain;
use tugreflect_core::codec::read_artifact;
use tugreflect_core::config::EngineConfig;
use tugreflect_core::diagnostics::Diagnostics;
use tugreflect_core::engine::Engine;
use tugreflect_core::error::EngineError;
use tugreflect_core::extractor::parse_query;
use tugreflect_core::matcher::Matcher;
use tugreflect_core::model::MatchSet;
use tugreflect_core::output::{InspectResponse, QueryResponse, ResolveResponse, ScanResponse};
use tugreflect_core::scanner::ScannedModule;
use tugreflect_core::tree::ModuleTree;
use tugreflect_core::types::Location;

/// Location reported for chains given on the command line.
const EXPR_FILE: &str = "<expr>";

fn to_json<T: Serialize>(response: &T) -> Result<String, EngineError> {
    serde_json::to_string_pretty(response).map_err(|e| EngineError::internal(e.to_string()))
}

/// Resolve every query of the module in `tree_path`.
pub fn run_resolve(tree_path: &Path, config: &EngineConfig) -> Result<String, EngineError> {
    let tree = ModuleTree::load(tree_path)?;
    let resolution = Engine::new(config).resolve(&tree)?;
    to_json(&ResolveResponse::from_resolution(&resolution))
}

/// Scan the module in `tree_path` and list its declaration summaries.
pub fn run_scan(tree_path: &Path, config: &EngineConfig) -> Result<String, EngineError> {
    let tree = ModuleTree::load(tree_path)?;
    let mut diagnostics = Diagnostics::new();
    let scanned = if config.enabled {
        let engine = Engine::new(config);
        let deps = engine.load_dependencies()?;
        engine.scan(&tree, &deps, &mut diagnostics)
    } else {
        ScannedModule::default()
    };
    to_json(&ScanResponse::new(&tree.name, &scanned, &diagnostics))
}

/// Decode the metadata artifact at `meta_path`.
pub fn run_inspect(meta_path: &Path) -> Result<String, EngineError> {
    let metadata = read_artifact(meta_path)?;
    to_json(&InspectResponse::new(
        meta_path.display().to_string(),
        metadata,
    ))
}

/// Resolve one chain, e.g. `objects().withSupertype<a.I>()`, against a module.
pub fn run_query(tree_path: &Path, expr: &str, config: &EngineConfig) -> Result<String, EngineError> {
    let tree = ModuleTree::load(tree_path)?;
    let chain = parse_call_chain(expr, Location::new(EXPR_FILE, 1, 1))?;
    let query = parse_query(&chain, config)
        .map_err(|e| EngineError::invalid_args(e.kind.to_string()))?
        .ok_or_else(|| {
            EngineError::invalid_args(format!(
                "'{}' is not a query: expected objects(), classes() or functions()",
                expr
            ))
        })?;

    let mut diagnostics = Diagnostics::new();
    let matches = if config.enabled {
        let engine = Engine::new(config);
        let deps = engine.load_dependencies()?;
        let scanned = engine.scan(&tree, &deps, &mut diagnostics);
        Matcher::new(&scanned, config).resolve(&query).clone()
    } else {
        MatchSet::new()
    };

    to_json(&QueryResponse::new(
        &tree.name,
        expr,
        query,
        matches,
        &diagnostics,
    ))
}
