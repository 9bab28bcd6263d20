//! Declaration scanning.
//!
//! The scanner walks a [`ModuleTree`] and produces one [`DeclarationSummary`]
//! per class, object and named function reachable by qualified name:
//!
//! - Nested declarations get names reflecting lexical nesting (`pkg.Outer.Inner`).
//! - Member functions carry their owner; they are named `pkg.Owner.fn`.
//! - Function-local declarations are skipped: generated code could not name them.
//!
//! Supertype sets start as the declared supertypes and are then closed over
//! the module's own edges (plus any dependency hierarchy handed to the scanner),
//! with the configured root supertype added to every class and object.
//!
//! Unresolvable references degrade instead of failing: the entry is omitted
//! and a [`DiagnosticCode::ScanDegradation`] diagnostic is recorded. A function
//! whose signature mentions an unresolved type cannot be compared structurally
//! and is left out entirely.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::hierarchy::TypeHierarchy;
use crate::model::{
    DeclarationSummary, FunctionOwner, Kind, Name, Shape, Signature, TypeRef, UNIT_TYPE,
};
use crate::tree::{Decl, ModuleTree, TypeNode};
use crate::types::{FileId, Location};

// ============================================================================
// Scanned Module
// ============================================================================

/// Candidates of one module, grouped by file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedModule {
    files: BTreeMap<FileId, Vec<DeclarationSummary>>,
    packages: BTreeSet<String>,
    hierarchy: BTreeMap<Name, BTreeSet<Name>>,
}

impl ScannedModule {
    /// Summaries per file, files in lexicographic order.
    pub fn files(&self) -> &BTreeMap<FileId, Vec<DeclarationSummary>> {
        &self.files
    }

    /// Package names declared by the module's files.
    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    /// Flattened supertypes of every local class and object.
    pub fn hierarchy(&self) -> &BTreeMap<Name, BTreeSet<Name>> {
        &self.hierarchy
    }

    /// All candidates: files in order, then discovery order within a file.
    pub fn candidates(&self) -> impl Iterator<Item = &DeclarationSummary> {
        self.files.values().flatten()
    }

    /// Candidates of one kind, in [`candidates`](Self::candidates) order.
    pub fn candidates_of(&self, kind: Kind) -> impl Iterator<Item = &DeclarationSummary> {
        self.candidates().filter(move |d| d.kind == kind)
    }

    /// First candidate with the given qualified name.
    pub fn find(&self, fq_name: &str) -> Option<&DeclarationSummary> {
        self.candidates().find(|d| d.fq_name == fq_name)
    }

    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Scanner
// ============================================================================

/// A declaration before supertype closure.
struct RawDecl {
    file: FileId,
    fq_name: Name,
    kind: Kind,
    annotations: BTreeSet<Name>,
    shape: RawShape,
}

enum RawShape {
    ClassLike { direct: BTreeSet<Name> },
    Function {
        signature: Signature,
        owner: Option<FunctionOwner>,
    },
}

/// Scans module trees under one configuration.
pub struct Scanner<'a> {
    config: &'a EngineConfig,
    hierarchy: TypeHierarchy,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Scanner {
            config,
            hierarchy: TypeHierarchy::new(),
        }
    }

    /// Follow supertype edges published by a dependency during closure.
    pub fn with_published_hierarchy(mut self, published: &BTreeMap<Name, BTreeSet<Name>>) -> Self {
        self.hierarchy.extend_published(published);
        self
    }

    /// Scan a module.
    pub fn scan(&self, tree: &ModuleTree, diagnostics: &mut Diagnostics) -> ScannedModule {
        let mut raw = Vec::new();
        let mut packages = BTreeSet::new();

        for file in tree.files_in_order() {
            if !file.package.is_empty() {
                packages.insert(file.package.clone());
            }
            let before = raw.len();
            let mut walk = Walk {
                file: &file.id,
                out: &mut raw,
                diagnostics: &mut *diagnostics,
            };
            for decl in &file.decls {
                walk.visit(decl, &file.package, None);
            }
            debug!(
                file = %file.id,
                declarations = raw.len() - before,
                "scanned file"
            );
        }

        let mut hierarchy = self.hierarchy.clone();
        for decl in &raw {
            if let RawShape::ClassLike { direct } = &decl.shape {
                hierarchy.add_edges(&decl.fq_name, direct.iter().cloned());
            }
        }

        let mut module = ScannedModule {
            packages,
            ..Default::default()
        };
        for decl in raw {
            let shape = match decl.shape {
                RawShape::ClassLike { direct } => {
                    let mut supertypes = hierarchy.close(&direct);
                    if let Some(root) = &self.config.root_supertype {
                        supertypes.insert(root.clone());
                    }
                    module
                        .hierarchy
                        .entry(decl.fq_name.clone())
                        .or_default()
                        .extend(supertypes.iter().cloned());
                    Shape::ClassLike { supertypes }
                }
                RawShape::Function { signature, owner } => Shape::Function { signature, owner },
            };
            module
                .files
                .entry(decl.file.clone())
                .or_default()
                .push(DeclarationSummary {
                    fq_name: decl.fq_name,
                    kind: decl.kind,
                    file: decl.file,
                    shape,
                    annotations: decl.annotations,
                });
        }
        module
    }
}

/// Scan a module without dependency hierarchy.
pub fn scan_module(
    tree: &ModuleTree,
    config: &EngineConfig,
    diagnostics: &mut Diagnostics,
) -> ScannedModule {
    Scanner::new(config).scan(tree, diagnostics)
}

// ============================================================================
// Tree Walk
// ============================================================================

struct Walk<'w> {
    file: &'w FileId,
    out: &'w mut Vec<RawDecl>,
    diagnostics: &'w mut Diagnostics,
}

impl Walk<'_> {
    fn visit(&mut self, decl: &Decl, scope: &str, owner: Option<&FunctionOwner>) {
        let fq_name = qualify(scope, &decl.name);
        let location = decl.location.as_ref();

        if decl.kind == Kind::Function {
            if let Some(signature) = self.signature(decl, &fq_name, location) {
                let annotations = self.names(&decl.annotations, Role::Annotation, &fq_name, location);
                self.out.push(RawDecl {
                    file: self.file.clone(),
                    fq_name,
                    kind: Kind::Function,
                    annotations,
                    shape: RawShape::Function {
                        signature,
                        owner: owner.cloned(),
                    },
                });
            }
            return;
        }

        let annotations = self.names(&decl.annotations, Role::Annotation, &fq_name, location);
        let direct = self.names(&decl.supertypes, Role::Supertype, &fq_name, location);
        self.out.push(RawDecl {
            file: self.file.clone(),
            fq_name: fq_name.clone(),
            kind: decl.kind,
            annotations,
            shape: RawShape::ClassLike { direct },
        });

        let member_owner = FunctionOwner {
            fq_name: fq_name.clone(),
            is_object: decl.kind == Kind::Object,
        };
        for member in &decl.members {
            self.visit(member, &fq_name, Some(&member_owner));
        }
    }

    /// Erased class names of a supertype or annotation list, degrading bad entries.
    fn names(
        &mut self,
        nodes: &[TypeNode],
        role: Role,
        fq_name: &str,
        location: Option<&Location>,
    ) -> BTreeSet<Name> {
        let mut names = BTreeSet::new();
        for node in nodes {
            match node {
                TypeNode::Resolved(ty) => match role.erase(ty) {
                    Some(name) => {
                        names.insert(name);
                    }
                    None => self.degrade(
                        format!("{} `{}` of `{}` is not a class type; omitted", role, ty, fq_name),
                        location,
                    ),
                },
                TypeNode::Unresolved { unresolved } => self.degrade(
                    format!("unresolved {} `{}` on `{}`; omitted", role, unresolved, fq_name),
                    location,
                ),
            }
        }
        names
    }

    fn signature(
        &mut self,
        decl: &Decl,
        fq_name: &str,
        location: Option<&Location>,
    ) -> Option<Signature> {
        let unit = TypeNode::Resolved(TypeRef::named(UNIT_TYPE));
        let returns = decl.returns.as_ref().unwrap_or(&unit);
        let nodes = decl
            .receiver
            .iter()
            .chain(decl.params.iter())
            .chain(std::iter::once(returns));

        for node in nodes {
            if let TypeNode::Unresolved { unresolved } = node {
                self.degrade(
                    format!(
                        "function `{}` skipped: unresolved type `{}` in signature",
                        fq_name, unresolved
                    ),
                    location,
                );
                return None;
            }
        }

        let resolved = |node: &TypeNode| node.resolved().cloned();
        Some(Signature {
            type_params: decl.type_params,
            receiver: decl.receiver.as_ref().and_then(resolved),
            params: decl.params.iter().filter_map(resolved).collect(),
            returns: resolved(returns)?,
        })
    }

    fn degrade(&mut self, message: String, location: Option<&Location>) {
        self.diagnostics.push(
            Diagnostic::new(DiagnosticCode::ScanDegradation, message)
                .with_location(location.cloned()),
        );
    }
}

/// What a type list on a class-like declaration means.
#[derive(Debug, Clone, Copy)]
enum Role {
    Supertype,
    Annotation,
}

impl Role {
    fn erase(self, ty: &TypeRef) -> Option<Name> {
        match self {
            Role::Supertype => ty.supertype_name(),
            Role::Annotation => ty.class_name().map(str::to_string),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Supertype => "supertype",
            Role::Annotation => "annotation",
        })
    }
}

fn qualify(scope: &str, name: &str) -> Name {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SourceFile;

    fn scan(tree: &ModuleTree) -> (ScannedModule, Diagnostics) {
        let config = EngineConfig::default();
        let mut diags = Diagnostics::new();
        let scanned = scan_module(tree, &config, &mut diags);
        (scanned, diags)
    }

    fn names(scanned: &ScannedModule) -> Vec<&str> {
        scanned.candidates().map(|d| d.fq_name.as_str()).collect()
    }

    mod naming_tests {
        use super::*;

        #[test]
        fn nested_declarations_are_qualified() {
            let tree = ModuleTree::new("m").with_file(
                SourceFile::new("C.kt", "p").with_decl(
                    Decl::class("C3").with_member(Decl::class("C5").with_member(Decl::object("O"))),
                ),
            );
            let (scanned, _) = scan(&tree);
            assert_eq!(names(&scanned), vec!["p.C3", "p.C3.C5", "p.C3.C5.O"]);
        }

        #[test]
        fn default_package_has_no_prefix() {
            let tree =
                ModuleTree::new("m").with_file(SourceFile::new("A.kt", "").with_decl(Decl::object("A")));
            let (scanned, _) = scan(&tree);
            assert_eq!(names(&scanned), vec!["A"]);
            assert!(scanned.packages().is_empty());
        }

        #[test]
        fn local_declarations_are_excluded() {
            let tree = ModuleTree::new("m").with_file(
                SourceFile::new("F.kt", "p").with_decl(
                    Decl::function("main")
                        .with_local(Decl::object("Hidden"))
                        .with_local(Decl::function("helper")),
                ),
            );
            let (scanned, _) = scan(&tree);
            assert_eq!(names(&scanned), vec!["p.main"]);
        }

        #[test]
        fn member_functions_record_owner() {
            let tree = ModuleTree::new("m").with_file(
                SourceFile::new("F.kt", "p")
                    .with_decl(Decl::object("Holder").with_member(Decl::function("run")))
                    .with_decl(Decl::class("Box").with_member(Decl::function("get"))),
            );
            let (scanned, _) = scan(&tree);
            match &scanned.find("p.Holder.run").unwrap().shape {
                Shape::Function { owner, .. } => assert_eq!(
                    owner.as_ref().unwrap(),
                    &FunctionOwner {
                        fq_name: "p.Holder".to_string(),
                        is_object: true
                    }
                ),
                other => panic!("unexpected shape {other:?}"),
            }
            match &scanned.find("p.Box.get").unwrap().shape {
                Shape::Function { owner, .. } => assert!(!owner.as_ref().unwrap().is_object),
                other => panic!("unexpected shape {other:?}"),
            }
        }
    }

    mod ordering_tests {
        use super::*;

        #[test]
        fn files_visit_lexicographically_then_discovery_order() {
            let tree = ModuleTree::new("m")
                .with_file(
                    SourceFile::new("src/b.kt", "p")
                        .with_decl(Decl::object("B2"))
                        .with_decl(Decl::object("B1")),
                )
                .with_file(SourceFile::new("src/a.kt", "p").with_decl(Decl::object("A")));
            let (scanned, _) = scan(&tree);
            assert_eq!(names(&scanned), vec!["p.A", "p.B2", "p.B1"]);
        }

        #[test]
        fn candidates_of_filters_by_kind() {
            let tree = ModuleTree::new("m").with_file(
                SourceFile::new("a.kt", "p")
                    .with_decl(Decl::object("O"))
                    .with_decl(Decl::class("C"))
                    .with_decl(Decl::function("f")),
            );
            let (scanned, _) = scan(&tree);
            let classes: Vec<&str> = scanned
                .candidates_of(Kind::Class)
                .map(|d| d.fq_name.as_str())
                .collect();
            assert_eq!(classes, vec!["p.C"]);
            assert_eq!(scanned.len(), 3);
        }
    }

    mod supertype_tests {
        use super::*;

        #[test]
        fn supertypes_are_closed_over_local_edges_and_include_root() {
            let tree = ModuleTree::new("m").with_file(
                SourceFile::new("a.kt", "p")
                    .with_decl(Decl::class("Base").with_supertype("p.Iface"))
                    .with_decl(Decl::class("Derived").with_supertype("p.Base")),
            );
            let (scanned, _) = scan(&tree);
            let derived = scanned.find("p.Derived").unwrap().supertypes().unwrap();
            let expected: BTreeSet<Name> = ["kotlin.Any", "p.Base", "p.Iface"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            assert_eq!(derived, &expected);
            assert_eq!(scanned.hierarchy().get("p.Derived"), Some(&expected));
        }

        #[test]
        fn no_root_supertype_when_disabled() {
            let tree = ModuleTree::new("m")
                .with_file(SourceFile::new("a.kt", "p").with_decl(Decl::object("O")));
            let config = EngineConfig::default().with_root_supertype(None);
            let scanned = scan_module(&tree, &config, &mut Diagnostics::new());
            assert!(scanned.find("p.O").unwrap().supertypes().unwrap().is_empty());
        }

        #[test]
        fn published_hierarchy_extends_closure() {
            let tree = ModuleTree::new("app").with_file(
                SourceFile::new("a.kt", "app").with_decl(Decl::class("Impl").with_supertype("lib.Base")),
            );
            let mut published = BTreeMap::new();
            published.insert(
                "lib.Base".to_string(),
                BTreeSet::from(["lib.Root".to_string()]),
            );
            let config = EngineConfig::default();
            let scanned = Scanner::new(&config)
                .with_published_hierarchy(&published)
                .scan(&tree, &mut Diagnostics::new());
            assert!(scanned
                .find("app.Impl")
                .unwrap()
                .supertypes()
                .unwrap()
                .contains("lib.Root"));
        }

        #[test]
        fn generic_supertypes_are_erased() {
            let tree = ModuleTree::new("m").with_file(
                SourceFile::new("a.kt", "p").with_decl(
                    Decl::class("Ints")
                        .with_supertype(TypeRef::generic("kotlin.collections.List", vec![TypeRef::named("kotlin.Int")])),
                ),
            );
            let (scanned, _) = scan(&tree);
            assert!(scanned
                .find("p.Ints")
                .unwrap()
                .supertypes()
                .unwrap()
                .contains("kotlin.collections.List"));
        }

        #[test]
        fn function_type_supertype_is_function_interface() {
            let int = TypeRef::named("kotlin.Int");
            let unit = TypeRef::named(UNIT_TYPE);
            let tree = ModuleTree::new("m").with_file(
                SourceFile::new("a.kt", "p")
                    .with_decl(
                        Decl::class("Handler")
                            .with_supertype(TypeRef::function(None, vec![int.clone()], unit.clone())),
                    )
                    .with_decl(Decl::class("Ext").with_supertype(TypeRef::function(
                        Some(int.clone()),
                        vec![int],
                        unit,
                    ))),
            );
            let (scanned, diags) = scan(&tree);
            assert!(diags.is_empty());
            let handler = scanned.find("p.Handler").unwrap().supertypes().unwrap();
            assert!(handler.contains("kotlin.Function1"));
            assert!(handler.contains("kotlin.Any"));
            let ext = scanned.find("p.Ext").unwrap().supertypes().unwrap();
            assert!(ext.contains("kotlin.Function2"));
        }

        #[test]
        fn function_type_annotation_is_omitted() {
            let tree = ModuleTree::new("m").with_file(SourceFile::new("a.kt", "p").with_decl(
                Decl::object("O").with_annotation(TypeRef::function(
                    None,
                    vec![],
                    TypeRef::named(UNIT_TYPE),
                )),
            ));
            let (scanned, diags) = scan(&tree);
            assert!(scanned.find("p.O").unwrap().annotations.is_empty());
            assert_eq!(diags.count(DiagnosticCode::ScanDegradation), 1);
        }
    }

    mod degradation_tests {
        use super::*;

        #[test]
        fn unresolved_supertype_is_omitted_with_diagnostic() {
            let tree = ModuleTree::new("m").with_file(
                SourceFile::new("a.kt", "p")
                    .with_decl(
                        Decl::object("O")
                            .at(Location::new("a.kt", 4, 1))
                            .with_supertype("p.I")
                            .with_supertype(TypeNode::unresolved("Missing"))
                            .with_annotation(TypeNode::unresolved("Gone")),
                    )
                    .with_decl(Decl::object("Other").with_supertype("p.I")),
            );
            let (scanned, diags) = scan(&tree);

            let o = scanned.find("p.O").unwrap();
            assert!(o.supertypes().unwrap().contains("p.I"));
            assert!(!o.supertypes().unwrap().contains("Missing"));
            assert!(o.annotations.is_empty());
            assert!(scanned.find("p.Other").is_some());

            assert_eq!(diags.count(DiagnosticCode::ScanDegradation), 2);
            assert_eq!(
                diags.iter().next().unwrap().location,
                Some(Location::new("a.kt", 4, 1))
            );
        }

        #[test]
        fn function_with_unresolved_signature_is_skipped() {
            let tree = ModuleTree::new("m").with_file(
                SourceFile::new("a.kt", "p")
                    .with_decl(Decl::function("bad").with_param(TypeNode::unresolved("Nope")))
                    .with_decl(Decl::function("good").with_param("kotlin.Int")),
            );
            let (scanned, diags) = scan(&tree);
            assert_eq!(names(&scanned), vec!["p.good"]);
            assert_eq!(diags.count(DiagnosticCode::ScanDegradation), 1);
        }

        #[test]
        fn missing_return_type_means_unit() {
            let tree = ModuleTree::new("m")
                .with_file(SourceFile::new("a.kt", "p").with_decl(Decl::function("f")));
            let (scanned, _) = scan(&tree);
            assert_eq!(
                scanned.find("p.f").unwrap().signature().unwrap(),
                &Signature::new(vec![], TypeRef::named(UNIT_TYPE))
            );
        }
    }
}
