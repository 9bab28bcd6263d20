//! tugreflect: compile-time declaration queries.
//!
//! Scans a module's declaration tree, resolves every `objects()`, `classes()`
//! and `functions()` query against it, and propagates the results to dependent
//! modules through a per-module metadata artifact.

// Engine - re-exported from tugreflect-core
pub use tugreflect_core::chain;
pub use tugreflect_core::codec;
pub use tugreflect_core::config;
pub use tugreflect_core::diagnostics;
pub use tugreflect_core::engine;
pub use tugreflect_core::error;
pub use tugreflect_core::extractor;
pub use tugreflect_core::hierarchy;
pub use tugreflect_core::matcher;
pub use tugreflect_core::merge;
pub use tugreflect_core::model;
pub use tugreflect_core::output;
pub use tugreflect_core::scanner;
pub use tugreflect_core::tree;
pub use tugreflect_core::types;

// Front door
pub mod cli;
