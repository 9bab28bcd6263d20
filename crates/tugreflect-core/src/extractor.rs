//! Query extraction from DSL call chains.
//!
//! A chain is a query when its first call is an entry call (`objects()`,
//! `classes()`, `functions()`) on a recognized entry receiver, or on no receiver
//! at all. The calls that follow refine the filter:
//!
//! | Call | Kinds | Effect |
//! |------|-------|--------|
//! | `withSupertype<T>()` / `withSuperType<T>()` | object, class | require supertype `T` |
//! | `withSupertypes(A::class, ...)` / `withSuperTypes(...)` | object, class | require every listed supertype |
//! | `withAnnotations<T>(A::class, ...)` | object, class | require supertype `T` and the annotations |
//! | `withAnnotations<F>(A::class, ...)` | function | require signature `F` and the annotations |
//! | `withSignature<F>()` | function | require signature `F` |
//! | `toList()` / `toSet()` | all | end of the query; later calls are ignored |
//!
//! Chains that are not queries are ignored silently. Malformed queries are
//! dropped with a [`DiagnosticCode::QueryParse`] diagnostic; extraction of the
//! rest of the module continues.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::model::{Filter, Kind, Name, Query, Signature, SignatureFilter, SupertypeFilter, TypeRef};
use crate::tree::{CallArg, CallChain, CallSegment, Decl, ModuleTree, TypeNode};
use crate::types::{FileId, Location};

// ============================================================================
// Errors
// ============================================================================

/// A malformed DSL call-site.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{location}: {kind}")]
pub struct QueryParseError {
    pub location: Location,
    pub kind: QueryParseErrorKind,
}

/// What is wrong with a call-site.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryParseErrorKind {
    #[error("conflicting kind markers: `{first}` query continued with a `{second}` entry call")]
    ConflictingKind { first: Kind, second: Kind },

    #[error("`{call}` is not valid on a {kind} query")]
    InvalidForKind { call: String, kind: Kind },

    #[error("unresolved type `{text}` in `{call}`")]
    UnresolvedType { call: String, text: String },

    #[error("`{call}` expects a class type, found `{found}`")]
    NotAClassType { call: String, found: String },

    #[error("`{call}` expects a function type, found `{found}`")]
    NotAFunctionType { call: String, found: String },

    #[error("`{call}` expects {expected} type argument(s), found {found}")]
    TypeArgCount {
        call: String,
        expected: &'static str,
        found: usize,
    },

    #[error("`{call}` takes no value arguments")]
    UnexpectedArguments { call: String },

    #[error("`{call}` needs at least one class literal")]
    MissingArguments { call: String },

    #[error("`{call}` only accepts class literals, found `{text}`")]
    UnsupportedArgument { call: String, text: String },

    #[error("conflicting signature constraints: `{first}` and `{second}`")]
    ConflictingSignature { first: String, second: String },

    #[error("function query has no signature constraint")]
    MissingSignature,

    #[error("unknown query call `{call}`")]
    UnknownCall { call: String },
}

// ============================================================================
// Extracted Queries
// ============================================================================

/// One query call-site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSiteQuery {
    pub file: FileId,
    pub location: Location,
    pub query: Query,
}

/// All query call-sites of a module, in file then source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedQueries {
    sites: Vec<CallSiteQuery>,
}

impl ExtractedQueries {
    pub fn sites(&self) -> &[CallSiteQuery] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Distinct queries, in first-occurrence order.
    pub fn distinct(&self) -> Vec<&Query> {
        let mut seen = BTreeSet::new();
        self.sites
            .iter()
            .map(|site| &site.query)
            .filter(|query| seen.insert(*query))
            .collect()
    }

    /// The query extracted at a call-site.
    pub fn at(&self, location: &Location) -> Option<&Query> {
        self.sites
            .iter()
            .find(|site| &site.location == location)
            .map(|site| &site.query)
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract every query call-site of a module.
pub fn extract_queries(
    tree: &ModuleTree,
    config: &EngineConfig,
    diagnostics: &mut Diagnostics,
) -> ExtractedQueries {
    let mut sites = Vec::new();
    for file in tree.files_in_order() {
        let mut chains = Vec::new();
        chains.extend(file.calls.iter());
        for decl in &file.decls {
            collect_chains(decl, &mut chains);
        }

        let mut file_sites = Vec::new();
        for chain in chains {
            match parse_query(chain, config) {
                Ok(Some(query)) => file_sites.push(CallSiteQuery {
                    file: file.id.clone(),
                    location: chain.location.clone(),
                    query,
                }),
                Ok(None) => {}
                Err(err) => diagnostics.push(
                    Diagnostic::new(DiagnosticCode::QueryParse, err.kind.to_string())
                        .with_location(Some(err.location)),
                ),
            }
        }
        file_sites.sort_by(|a, b| a.location.cmp(&b.location));
        debug!(file = %file.id, queries = file_sites.len(), "extracted queries");
        sites.extend(file_sites);
    }
    ExtractedQueries { sites }
}

/// Chains in a declaration, its members and its locals, in tree order.
fn collect_chains<'t>(decl: &'t Decl, out: &mut Vec<&'t CallChain>) {
    out.extend(decl.calls.iter());
    for member in &decl.members {
        collect_chains(member, out);
    }
    for local in &decl.locals {
        collect_chains(local, out);
    }
}

/// Parse one chain.
///
/// Returns `Ok(None)` if the chain is not a query at all.
pub fn parse_query(
    chain: &CallChain,
    config: &EngineConfig,
) -> Result<Option<Query>, QueryParseError> {
    let Some((entry, rest)) = chain.segments.split_first() else {
        return Ok(None);
    };
    let Some(kind) = Kind::from_entry_call(&entry.name) else {
        return Ok(None);
    };
    if let Some(receiver) = &chain.receiver {
        if !config.is_entry_point(receiver) {
            return Ok(None);
        }
    }

    let located = |kind| QueryParseError {
        location: chain.location.clone(),
        kind,
    };

    if !entry.type_args.is_empty() || !entry.args.is_empty() {
        return Err(located(QueryParseErrorKind::UnexpectedArguments {
            call: entry.name.clone(),
        }));
    }

    let mut builder = QueryBuilder::new(kind);
    for segment in rest {
        match segment.name.as_str() {
            "toList" | "toSet" => break,
            _ => builder.apply(segment).map_err(located)?,
        }
    }
    builder.finish().map(Some).map_err(located)
}

struct QueryBuilder {
    kind: Kind,
    supertypes: BTreeSet<Name>,
    annotations: BTreeSet<Name>,
    signature: Option<Signature>,
}

impl QueryBuilder {
    fn new(kind: Kind) -> Self {
        QueryBuilder {
            kind,
            supertypes: BTreeSet::new(),
            annotations: BTreeSet::new(),
            signature: None,
        }
    }

    fn apply(&mut self, segment: &CallSegment) -> Result<(), QueryParseErrorKind> {
        let call = segment.name.as_str();
        match call {
            "objects" | "classes" | "functions" => Err(QueryParseErrorKind::ConflictingKind {
                first: self.kind,
                second: Kind::from_entry_call(call).unwrap_or(self.kind),
            }),
            "withSupertype" | "withSuperType" => {
                self.require_class_like(call)?;
                no_value_args(segment)?;
                let ty = single_type_arg(segment)?;
                self.supertypes.insert(class_name(call, ty)?);
                Ok(())
            }
            "withSupertypes" | "withSuperTypes" => {
                self.require_class_like(call)?;
                if !segment.type_args.is_empty() {
                    return Err(QueryParseErrorKind::TypeArgCount {
                        call: call.to_string(),
                        expected: "0",
                        found: segment.type_args.len(),
                    });
                }
                let names = class_literals(segment)?;
                if names.is_empty() {
                    return Err(QueryParseErrorKind::MissingArguments {
                        call: call.to_string(),
                    });
                }
                self.supertypes.extend(names);
                Ok(())
            }
            "withAnnotations" => {
                let annotations = class_literals(segment)?;
                if self.kind == Kind::Function {
                    let ty = single_type_arg(segment)?;
                    self.set_signature(call, ty)?;
                } else {
                    match segment.type_args.as_slice() {
                        [] => {}
                        [node] => {
                            let name = class_name(call, resolved(call, node)?)?;
                            self.supertypes.insert(name);
                        }
                        more => {
                            return Err(QueryParseErrorKind::TypeArgCount {
                                call: call.to_string(),
                                expected: "at most 1",
                                found: more.len(),
                            })
                        }
                    }
                }
                self.annotations.extend(annotations);
                Ok(())
            }
            "withSignature" => {
                if self.kind != Kind::Function {
                    return Err(QueryParseErrorKind::InvalidForKind {
                        call: call.to_string(),
                        kind: self.kind,
                    });
                }
                no_value_args(segment)?;
                let ty = single_type_arg(segment)?;
                self.set_signature(call, ty)
            }
            _ => Err(QueryParseErrorKind::UnknownCall {
                call: call.to_string(),
            }),
        }
    }

    fn require_class_like(&self, call: &str) -> Result<(), QueryParseErrorKind> {
        if self.kind.is_class_like() {
            Ok(())
        } else {
            Err(QueryParseErrorKind::InvalidForKind {
                call: call.to_string(),
                kind: self.kind,
            })
        }
    }

    fn set_signature(&mut self, call: &str, ty: &TypeRef) -> Result<(), QueryParseErrorKind> {
        let signature =
            Signature::from_function_type(ty).ok_or_else(|| QueryParseErrorKind::NotAFunctionType {
                call: call.to_string(),
                found: ty.to_string(),
            })?;
        match &self.signature {
            Some(existing) if *existing != signature => {
                Err(QueryParseErrorKind::ConflictingSignature {
                    first: existing.to_string(),
                    second: signature.to_string(),
                })
            }
            _ => {
                self.signature = Some(signature);
                Ok(())
            }
        }
    }

    fn finish(self) -> Result<Query, QueryParseErrorKind> {
        let filter = match self.kind {
            Kind::Function => Filter::Signature(SignatureFilter {
                signature: self.signature.ok_or(QueryParseErrorKind::MissingSignature)?,
                annotations: self.annotations,
            }),
            Kind::Object | Kind::Class => Filter::Supertypes(SupertypeFilter {
                supertypes: self.supertypes,
                annotations: self.annotations,
            }),
        };
        Ok(Query::new(self.kind, filter))
    }
}

fn resolved<'n>(call: &str, node: &'n TypeNode) -> Result<&'n TypeRef, QueryParseErrorKind> {
    match node {
        TypeNode::Resolved(ty) => Ok(ty),
        TypeNode::Unresolved { unresolved } => Err(QueryParseErrorKind::UnresolvedType {
            call: call.to_string(),
            text: unresolved.clone(),
        }),
    }
}

fn class_name(call: &str, ty: &TypeRef) -> Result<Name, QueryParseErrorKind> {
    ty.class_name()
        .map(str::to_string)
        .ok_or_else(|| QueryParseErrorKind::NotAClassType {
            call: call.to_string(),
            found: ty.to_string(),
        })
}

fn single_type_arg(segment: &CallSegment) -> Result<&TypeRef, QueryParseErrorKind> {
    match segment.type_args.as_slice() {
        [node] => resolved(&segment.name, node),
        args => Err(QueryParseErrorKind::TypeArgCount {
            call: segment.name.clone(),
            expected: "1",
            found: args.len(),
        }),
    }
}

fn no_value_args(segment: &CallSegment) -> Result<(), QueryParseErrorKind> {
    if segment.args.is_empty() {
        Ok(())
    } else {
        Err(QueryParseErrorKind::UnexpectedArguments {
            call: segment.name.clone(),
        })
    }
}

fn class_literals(segment: &CallSegment) -> Result<Vec<Name>, QueryParseErrorKind> {
    let call = segment.name.as_str();
    segment
        .args
        .iter()
        .map(|arg| match arg {
            CallArg::ClassLiteral { ty } => class_name(call, resolved(call, ty)?),
            CallArg::Expr { text } => Err(QueryParseErrorKind::UnsupportedArgument {
                call: call.to_string(),
                text: text.clone(),
            }),
        })
        .collect()
}
