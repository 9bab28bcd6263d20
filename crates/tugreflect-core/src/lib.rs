//! Core engine for tugreflect.
//!
//! This crate resolves declaration queries statically, per module:
//! - Declaration tree model consumed from a compiler frontend
//! - Declaration scanning and supertype closure
//! - Query extraction from DSL call chains
//! - Matching queries against scanned candidates
//! - Metadata artifact codec and cross-module merge
//! - Configuration, error types and JSON output types for the CLI

pub mod chain;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod hierarchy;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod output;
pub mod scanner;
pub mod tree;
pub mod types;
