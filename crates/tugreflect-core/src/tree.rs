//! Declaration tree consumed from the compiler frontend.
//!
//! The frontend hands the engine one [`ModuleTree`] per module: every file with
//! its package, its declarations (already type-resolved), and the call chains
//! that appear in it. The engine never parses source text itself; the tree is
//! plain serde data so it can be produced by any frontend and stored as JSON.
//!
//! Type references the frontend could not resolve are kept as
//! [`TypeNode::Unresolved`] so the scanner and extractor can report them
//! instead of silently dropping them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Kind, TypeRef};
use crate::types::{FileId, Location};

/// Errors loading a declaration tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("declaration tree not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid declaration tree {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Tree
// ============================================================================

/// All files of one module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleTree {
    /// Module name, recorded in published metadata.
    pub name: String,
    #[serde(default)]
    pub files: Vec<SourceFile>,
}

impl ModuleTree {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleTree {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: SourceFile) -> Self {
        self.files.push(file);
        self
    }

    /// Files in lexicographic [`FileId`] order.
    ///
    /// Every stage visits files in this order.
    pub fn files_in_order(&self) -> Vec<&SourceFile> {
        let mut files: Vec<&SourceFile> = self.files.iter().collect();
        files.sort_by(|a, b| a.id.cmp(&b.id));
        files
    }

    /// Parse a tree from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a tree from a JSON file.
    pub fn load(path: &Path) -> Result<Self, TreeError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TreeError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(TreeError::Io(e)),
        };
        ModuleTree::from_json(&text).map_err(|source| TreeError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// One source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: FileId,
    /// Package name; empty for the default package.
    #[serde(default)]
    pub package: String,
    /// Top-level declarations in source order.
    #[serde(default)]
    pub decls: Vec<Decl>,
    /// Call chains outside any declaration (top-level initializers).
    #[serde(default)]
    pub calls: Vec<CallChain>,
}

impl SourceFile {
    pub fn new(id: impl Into<FileId>, package: impl Into<String>) -> Self {
        SourceFile {
            id: id.into(),
            package: package.into(),
            decls: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn with_decl(mut self, decl: Decl) -> Self {
        self.decls.push(decl);
        self
    }

    pub fn with_call(mut self, call: CallChain) -> Self {
        self.calls.push(call);
        self
    }
}

/// A class, object or function declaration.
///
/// Interfaces and enum classes arrive as [`Kind::Class`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub kind: Kind,
    /// Simple name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Declared (direct) supertypes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<TypeNode>,
    /// Annotation types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<TypeNode>,
    /// Number of type parameters (functions).
    #[serde(default)]
    pub type_params: u32,
    /// Extension receiver (functions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<TypeNode>,
    /// Parameter types (functions).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<TypeNode>,
    /// Return type (functions); absent means `Unit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeNode>,
    /// Nested classes, objects and member functions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Decl>,
    /// Declarations local to a function body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locals: Vec<Decl>,
    /// Call chains in this declaration's body and initializers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallChain>,
}

impl Decl {
    fn bare(kind: Kind, name: impl Into<String>) -> Self {
        Decl {
            kind,
            name: name.into(),
            location: None,
            supertypes: Vec::new(),
            annotations: Vec::new(),
            type_params: 0,
            receiver: None,
            params: Vec::new(),
            returns: None,
            members: Vec::new(),
            locals: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Decl::bare(Kind::Class, name)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Decl::bare(Kind::Object, name)
    }

    pub fn function(name: impl Into<String>) -> Self {
        Decl::bare(Kind::Function, name)
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_supertype(mut self, ty: impl Into<TypeNode>) -> Self {
        self.supertypes.push(ty.into());
        self
    }

    pub fn with_annotation(mut self, ty: impl Into<TypeNode>) -> Self {
        self.annotations.push(ty.into());
        self
    }

    pub fn with_type_params(mut self, arity: u32) -> Self {
        self.type_params = arity;
        self
    }

    pub fn with_receiver(mut self, ty: impl Into<TypeNode>) -> Self {
        self.receiver = Some(ty.into());
        self
    }

    pub fn with_param(mut self, ty: impl Into<TypeNode>) -> Self {
        self.params.push(ty.into());
        self
    }

    pub fn returning(mut self, ty: impl Into<TypeNode>) -> Self {
        self.returns = Some(ty.into());
        self
    }

    pub fn with_member(mut self, decl: Decl) -> Self {
        self.members.push(decl);
        self
    }

    pub fn with_local(mut self, decl: Decl) -> Self {
        self.locals.push(decl);
        self
    }

    pub fn with_call(mut self, call: CallChain) -> Self {
        self.calls.push(call);
        self
    }
}

/// A type reference as the frontend resolved it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeNode {
    Resolved(TypeRef),
    /// Source text of a reference the frontend could not resolve.
    Unresolved { unresolved: String },
}

impl TypeNode {
    pub fn unresolved(text: impl Into<String>) -> Self {
        TypeNode::Unresolved {
            unresolved: text.into(),
        }
    }

    pub fn resolved(&self) -> Option<&TypeRef> {
        match self {
            TypeNode::Resolved(ty) => Some(ty),
            TypeNode::Unresolved { .. } => None,
        }
    }

    /// Source-like text, for diagnostics.
    pub fn text(&self) -> String {
        match self {
            TypeNode::Resolved(ty) => ty.to_string(),
            TypeNode::Unresolved { unresolved } => unresolved.clone(),
        }
    }
}

impl From<TypeRef> for TypeNode {
    fn from(ty: TypeRef) -> Self {
        TypeNode::Resolved(ty)
    }
}

impl From<&str> for TypeNode {
    fn from(name: &str) -> Self {
        TypeNode::Resolved(TypeRef::named(name))
    }
}

// ============================================================================
// Call Chains
// ============================================================================

/// A chain of dotted calls, `Recv.a<T>(x).b(y)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallChain {
    /// Location of the first call.
    pub location: Location,
    /// Qualified receiver expression, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    pub segments: Vec<CallSegment>,
}

impl CallChain {
    pub fn new(location: Location) -> Self {
        CallChain {
            location,
            receiver: None,
            segments: Vec::new(),
        }
    }

    pub fn on(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    pub fn call(mut self, segment: CallSegment) -> Self {
        self.segments.push(segment);
        self
    }
}

/// One call in a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSegment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_args: Vec<TypeNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<CallArg>,
}

impl CallSegment {
    pub fn new(name: impl Into<String>) -> Self {
        CallSegment {
            name: name.into(),
            type_args: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn with_type_arg(mut self, ty: impl Into<TypeNode>) -> Self {
        self.type_args.push(ty.into());
        self
    }

    pub fn with_arg(mut self, arg: CallArg) -> Self {
        self.args.push(arg);
        self
    }
}

/// A value argument of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "arg", rename_all = "snake_case")]
pub enum CallArg {
    /// `Type::class`
    ClassLiteral { ty: TypeNode },
    /// Any other expression, kept as text.
    Expr { text: String },
}

impl CallArg {
    pub fn class_literal(ty: impl Into<TypeNode>) -> Self {
        CallArg::ClassLiteral { ty: ty.into() }
    }

    pub fn expr(text: impl Into<String>) -> Self {
        CallArg::Expr { text: text.into() }
    }
}
