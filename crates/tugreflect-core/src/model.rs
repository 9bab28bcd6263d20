//! Query model: filters, queries, declaration summaries and module metadata.
//!
//! This module provides the value types every other stage exchanges:
//! - [`Filter`]: structural matching criteria ([`SupertypeFilter`] or [`SignatureFilter`])
//! - [`Query`]: one DSL call-site's request, a [`Kind`] plus a [`Filter`]
//! - [`DeclarationSummary`]: immutable shape of one scanned declaration
//! - [`MatchSet`]: ordered, duplicate-free set of matching declarations
//! - [`Uses`]: per-kind `Filter -> MatchSet` maps
//! - [`ModuleMetadata`]: one module's exported query surface
//!
//! # Equality
//!
//! All multi-valued name sets are `BTreeSet`s, so two filters built from the same
//! names in a different order compare (and hash, and serialize) identically. That
//! makes [`Filter`] and [`Query`] safe to use as map keys across files and modules.
//!
//! # Schema Versioning
//!
//! [`METADATA_SCHEMA_VERSION`] tracks breaking changes to the persisted
//! [`ModuleMetadata`] layout. It is independent of the CLI output schema in `output.rs`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::FileId;

// ============================================================================
// Schema Version
// ============================================================================

/// Schema version for persisted module metadata.
///
/// Increment this when:
/// - Adding/removing fields from serialized structs
/// - Changing field types or serialization format
/// - Breaking changes to enum variants
pub const METADATA_SCHEMA_VERSION: u32 = 1;

/// Return type assumed for functions that declare none.
pub const UNIT_TYPE: &str = "kotlin.Unit";

/// Fully qualified name of a type, annotation or declaration.
pub type Name = String;

fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// Kind
// ============================================================================

/// Kind of declaration a query asks for.
///
/// Carried explicitly on every [`Query`], [`DeclarationSummary`] and [`Uses`]
/// sub-map so lookups are keyed, not discovered by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Object,
    Class,
    Function,
}

impl Kind {
    /// All kinds, in metadata order.
    pub const ALL: [Kind; 3] = [Kind::Object, Kind::Class, Kind::Function];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Object => "object",
            Kind::Class => "class",
            Kind::Function => "function",
        }
    }

    /// Map a DSL entry call (`objects`, `classes`, `functions`) to its kind.
    pub fn from_entry_call(name: &str) -> Option<Kind> {
        match name {
            "objects" => Some(Kind::Object),
            "classes" => Some(Kind::Class),
            "functions" => Some(Kind::Function),
            _ => None,
        }
    }

    /// True for kinds whose candidates carry a supertype set.
    pub fn is_class_like(&self) -> bool {
        matches!(self, Kind::Object | Kind::Class)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Types
// ============================================================================

/// Variance of a type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum Variance {
    #[default]
    Invariant,
    In,
    Out,
}

/// A resolved type reference.
///
/// Generic type parameters are positional ([`TypeRef::Param`]); their names and
/// bounds are not part of the structure, so `fun <T> f(x: T)` and
/// `fun <R> g(y: R)` have equal parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeRef {
    /// A named (class-like) type, possibly generic.
    Named {
        name: Name,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeArg>,
        #[serde(default, skip_serializing_if = "is_false")]
        nullable: bool,
    },
    /// A reference to the enclosing declaration's type parameter by position.
    Param {
        index: u32,
        #[serde(default, skip_serializing_if = "is_false")]
        nullable: bool,
    },
    /// A function type `R.(A, B) -> C`.
    Function {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receiver: Option<Box<TypeRef>>,
        #[serde(default)]
        params: Vec<TypeRef>,
        returns: Box<TypeRef>,
        #[serde(default, skip_serializing_if = "is_false")]
        nullable: bool,
    },
}

/// A type argument of a generic [`TypeRef::Named`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "arg", rename_all = "snake_case")]
pub enum TypeArg {
    /// Star projection `*`.
    Star,
    /// A projected type.
    Type {
        #[serde(default)]
        variance: Variance,
        ty: TypeRef,
    },
}

impl TypeRef {
    /// Non-generic, non-nullable named type.
    pub fn named(name: impl Into<Name>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
            nullable: false,
        }
    }

    /// Generic named type with invariant arguments.
    pub fn generic(name: impl Into<Name>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: args
                .into_iter()
                .map(|ty| TypeArg::Type {
                    variance: Variance::Invariant,
                    ty,
                })
                .collect(),
            nullable: false,
        }
    }

    /// Positional type parameter reference.
    pub fn param(index: u32) -> Self {
        TypeRef::Param {
            index,
            nullable: false,
        }
    }

    /// Function type.
    pub fn function(receiver: Option<TypeRef>, params: Vec<TypeRef>, returns: TypeRef) -> Self {
        TypeRef::Function {
            receiver: receiver.map(Box::new),
            params,
            returns: Box::new(returns),
            nullable: false,
        }
    }

    /// The same type, marked nullable.
    pub fn nullable(mut self) -> Self {
        match &mut self {
            TypeRef::Named { nullable, .. }
            | TypeRef::Param { nullable, .. }
            | TypeRef::Function { nullable, .. } => *nullable = true,
        }
        self
    }

    /// The erased class name of a named type, `None` for parameters and function types.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeRef::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The erased class name of this type used as a supertype.
    ///
    /// A function type `R.(A) -> B` is the interface `kotlin.Function2`; arity
    /// counts the receiver.
    pub fn supertype_name(&self) -> Option<Name> {
        match self {
            TypeRef::Named { name, .. } => Some(name.clone()),
            TypeRef::Function {
                receiver, params, ..
            } => Some(format!(
                "kotlin.Function{}",
                params.len() + usize::from(receiver.is_some())
            )),
            TypeRef::Param { .. } => None,
        }
    }

    /// Highest type parameter position referenced anywhere in this type.
    fn max_param_index(&self) -> Option<u32> {
        match self {
            TypeRef::Named { args, .. } => args
                .iter()
                .filter_map(|arg| match arg {
                    TypeArg::Star => None,
                    TypeArg::Type { ty, .. } => ty.max_param_index(),
                })
                .max(),
            TypeRef::Param { index, .. } => Some(*index),
            TypeRef::Function {
                receiver,
                params,
                returns,
                ..
            } => receiver
                .iter()
                .map(|r| r.max_param_index())
                .chain(params.iter().map(TypeRef::max_param_index))
                .chain(std::iter::once(returns.max_param_index()))
                .flatten()
                .max(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named {
                name,
                args,
                nullable,
            } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
                if *nullable {
                    f.write_str("?")?;
                }
                Ok(())
            }
            TypeRef::Param { index, nullable } => {
                write!(f, "#{}", index)?;
                if *nullable {
                    f.write_str("?")?;
                }
                Ok(())
            }
            TypeRef::Function {
                receiver,
                params,
                returns,
                nullable,
            } => {
                if *nullable {
                    f.write_str("(")?;
                }
                write_function_shape(f, receiver.as_deref(), params, returns)?;
                if *nullable {
                    f.write_str(")?")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Star => f.write_str("*"),
            TypeArg::Type { variance, ty } => match variance {
                Variance::Invariant => write!(f, "{}", ty),
                Variance::In => write!(f, "in {}", ty),
                Variance::Out => write!(f, "out {}", ty),
            },
        }
    }
}

fn write_function_shape(
    f: &mut fmt::Formatter<'_>,
    receiver: Option<&TypeRef>,
    params: &[TypeRef],
    returns: &TypeRef,
) -> fmt::Result {
    if let Some(receiver) = receiver {
        write!(f, "{}.", receiver)?;
    }
    f.write_str("(")?;
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", param)?;
    }
    write!(f, ") -> {}", returns)
}

// ============================================================================
// Signature
// ============================================================================

/// Structural shape of a function.
///
/// Two signatures are equal iff every field is equal: receiver presence and type,
/// the parameter type sequence, the return type, and the type-parameter arity.
/// There is no variance- or bound-aware subtyping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
    /// Number of type parameters the function declares.
    #[serde(default)]
    pub type_params: u32,
    /// Extension receiver type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<TypeRef>,
    /// Parameter types in declaration order.
    #[serde(default)]
    pub params: Vec<TypeRef>,
    /// Return type.
    pub returns: TypeRef,
}

impl Signature {
    /// Create a non-generic signature without receiver.
    pub fn new(params: Vec<TypeRef>, returns: TypeRef) -> Self {
        Signature {
            type_params: 0,
            receiver: None,
            params,
            returns,
        }
    }

    /// Set the extension receiver.
    pub fn with_receiver(mut self, receiver: TypeRef) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Set the type-parameter arity.
    pub fn with_type_params(mut self, arity: u32) -> Self {
        self.type_params = arity;
        self
    }

    /// Build a signature from a function type used as a query type argument.
    ///
    /// The arity is one past the highest positional parameter the type mentions,
    /// so `(#0) -> #1` describes a function with two type parameters.
    /// Returns `None` if `ty` is not a function type.
    pub fn from_function_type(ty: &TypeRef) -> Option<Self> {
        match ty {
            TypeRef::Function {
                receiver,
                params,
                returns,
                ..
            } => Some(Signature {
                type_params: ty.max_param_index().map_or(0, |max| max + 1),
                receiver: receiver.as_deref().cloned(),
                params: params.clone(),
                returns: returns.as_ref().clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.type_params > 0 {
            f.write_str("<")?;
            for i in 0..self.type_params {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "#{}", i)?;
            }
            f.write_str("> ")?;
        }
        write_function_shape(f, self.receiver.as_ref(), &self.params, &self.returns)
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Supertype + annotation criteria for class and object queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SupertypeFilter {
    /// Every listed supertype must be present on a match.
    #[serde(default)]
    pub supertypes: BTreeSet<Name>,
    /// Required annotations. Empty means "not applied".
    #[serde(default)]
    pub annotations: BTreeSet<Name>,
}

/// Signature + annotation criteria for function queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignatureFilter {
    /// Exact structural signature a match must have.
    pub signature: Signature,
    /// Required annotations. Empty means "not applied".
    #[serde(default)]
    pub annotations: BTreeSet<Name>,
}

/// A query's matching criteria.
///
/// Equality is fully structural and is the sole notion of query identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum Filter {
    Supertypes(SupertypeFilter),
    Signature(SignatureFilter),
}

impl Filter {
    /// Build a supertype filter from any name iterables.
    pub fn supertypes<S, A>(supertypes: S, annotations: A) -> Self
    where
        S: IntoIterator,
        S::Item: Into<Name>,
        A: IntoIterator,
        A::Item: Into<Name>,
    {
        Filter::Supertypes(SupertypeFilter {
            supertypes: supertypes.into_iter().map(Into::into).collect(),
            annotations: annotations.into_iter().map(Into::into).collect(),
        })
    }

    /// Build a signature filter.
    pub fn signature<A>(signature: Signature, annotations: A) -> Self
    where
        A: IntoIterator,
        A::Item: Into<Name>,
    {
        Filter::Signature(SignatureFilter {
            signature,
            annotations: annotations.into_iter().map(Into::into).collect(),
        })
    }

    /// Required annotations of either variant.
    pub fn annotations(&self) -> &BTreeSet<Name> {
        match self {
            Filter::Supertypes(f) => &f.annotations,
            Filter::Signature(f) => &f.annotations,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |set: &BTreeSet<Name>| set.iter().cloned().collect::<Vec<_>>().join(", ");
        match self {
            Filter::Supertypes(filter) => write!(
                f,
                "supertypes {{{}}} annotations {{{}}}",
                join(&filter.supertypes),
                join(&filter.annotations)
            ),
            Filter::Signature(filter) => write!(
                f,
                "signature {} annotations {{{}}}",
                filter.signature,
                join(&filter.annotations)
            ),
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// One DSL call-site's request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Query {
    pub kind: Kind,
    pub filter: Filter,
}

impl Query {
    /// Create a query.
    pub fn new(kind: Kind, filter: Filter) -> Self {
        Query { kind, filter }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} query, {}", self.kind, self.filter)
    }
}

// ============================================================================
// Declaration Summary
// ============================================================================

/// Containing declaration of a member function.
///
/// Enough for a code generator to build a function reference: a member of an
/// object is bound to the object instance, a member of a class is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionOwner {
    pub fq_name: Name,
    pub is_object: bool,
}

/// Kind-specific part of a [`DeclarationSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    /// Classes and objects: flattened supertype names.
    ClassLike { supertypes: BTreeSet<Name> },
    /// Functions: structural signature and optional owner.
    Function {
        signature: Signature,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner: Option<FunctionOwner>,
    },
}

/// Immutable summary of one scanned declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclarationSummary {
    /// Qualified name reflecting lexical nesting (`pkg.Outer.Inner`).
    pub fq_name: Name,
    pub kind: Kind,
    /// File that declares it.
    pub file: FileId,
    #[serde(flatten)]
    pub shape: Shape,
    /// Annotation class names.
    #[serde(default)]
    pub annotations: BTreeSet<Name>,
}

impl DeclarationSummary {
    /// Summary of a class or object.
    pub fn class_like<S, A>(
        kind: Kind,
        fq_name: impl Into<Name>,
        file: FileId,
        supertypes: S,
        annotations: A,
    ) -> Self
    where
        S: IntoIterator,
        S::Item: Into<Name>,
        A: IntoIterator,
        A::Item: Into<Name>,
    {
        DeclarationSummary {
            fq_name: fq_name.into(),
            kind,
            file,
            shape: Shape::ClassLike {
                supertypes: supertypes.into_iter().map(Into::into).collect(),
            },
            annotations: annotations.into_iter().map(Into::into).collect(),
        }
    }

    /// Summary of a function.
    pub fn function<A>(
        fq_name: impl Into<Name>,
        file: FileId,
        signature: Signature,
        owner: Option<FunctionOwner>,
        annotations: A,
    ) -> Self
    where
        A: IntoIterator,
        A::Item: Into<Name>,
    {
        DeclarationSummary {
            fq_name: fq_name.into(),
            kind: Kind::Function,
            file,
            shape: Shape::Function { signature, owner },
            annotations: annotations.into_iter().map(Into::into).collect(),
        }
    }

    /// Supertype set, for classes and objects.
    pub fn supertypes(&self) -> Option<&BTreeSet<Name>> {
        match &self.shape {
            Shape::ClassLike { supertypes } => Some(supertypes),
            Shape::Function { .. } => None,
        }
    }

    /// Signature, for functions.
    pub fn signature(&self) -> Option<&Signature> {
        match &self.shape {
            Shape::Function { signature, .. } => Some(signature),
            Shape::ClassLike { .. } => None,
        }
    }
}

// ============================================================================
// MatchSet
// ============================================================================

/// Ordered, duplicate-free set of matching declarations.
///
/// Insertion order is preserved: for class and object queries it is the
/// deterministic discovery order the generated code relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DeclarationSummary>", into = "Vec<DeclarationSummary>")]
pub struct MatchSet(Vec<DeclarationSummary>);

impl MatchSet {
    /// Create an empty set.
    pub fn new() -> Self {
        MatchSet::default()
    }

    /// Append a declaration unless it is already present.
    ///
    /// Returns `true` if it was added.
    pub fn insert(&mut self, decl: DeclarationSummary) -> bool {
        if self.0.contains(&decl) {
            return false;
        }
        self.0.push(decl);
        true
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, DeclarationSummary> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Qualified names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|d| d.fq_name.as_str()).collect()
    }
}

impl From<Vec<DeclarationSummary>> for MatchSet {
    fn from(decls: Vec<DeclarationSummary>) -> Self {
        decls.into_iter().collect()
    }
}

impl From<MatchSet> for Vec<DeclarationSummary> {
    fn from(set: MatchSet) -> Self {
        set.0
    }
}

impl FromIterator<DeclarationSummary> for MatchSet {
    fn from_iter<I: IntoIterator<Item = DeclarationSummary>>(iter: I) -> Self {
        let mut set = MatchSet::new();
        for decl in iter {
            set.insert(decl);
        }
        set
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a DeclarationSummary;
    type IntoIter = std::slice::Iter<'a, DeclarationSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Uses
// ============================================================================

/// Match sets keyed by filter, for one kind.
pub type FilterMatches = BTreeMap<Filter, MatchSet>;

/// Per-kind `Filter -> MatchSet` maps.
///
/// The `(Kind, Filter)` pair identifies a result bucket: `objects()` and
/// `classes()` queries with the same supertype filter are different queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uses {
    #[serde(default, with = "filter_entries")]
    pub objects: FilterMatches,
    #[serde(default, with = "filter_entries")]
    pub classes: FilterMatches,
    #[serde(default, with = "filter_entries")]
    pub functions: FilterMatches,
}

impl Uses {
    /// Create empty uses.
    pub fn new() -> Self {
        Uses::default()
    }

    /// The sub-map for a kind.
    pub fn of_kind(&self, kind: Kind) -> &FilterMatches {
        match kind {
            Kind::Object => &self.objects,
            Kind::Class => &self.classes,
            Kind::Function => &self.functions,
        }
    }

    /// Mutable sub-map for a kind.
    pub fn of_kind_mut(&mut self, kind: Kind) -> &mut FilterMatches {
        match kind {
            Kind::Object => &mut self.objects,
            Kind::Class => &mut self.classes,
            Kind::Function => &mut self.functions,
        }
    }

    /// Matches recorded for a query.
    pub fn get(&self, query: &Query) -> Option<&MatchSet> {
        self.of_kind(query.kind).get(&query.filter)
    }

    /// Record matches for a query, replacing any previous entry.
    pub fn insert(&mut self, query: &Query, matches: MatchSet) {
        self.of_kind_mut(query.kind)
            .insert(query.filter.clone(), matches);
    }

    /// Total number of `(kind, filter)` entries.
    pub fn len(&self) -> usize {
        self.objects.len() + self.classes.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate all entries, objects then classes then functions, each in filter order.
    pub fn iter(&self) -> impl Iterator<Item = (Kind, &Filter, &MatchSet)> {
        Kind::ALL.into_iter().flat_map(move |kind| {
            self.of_kind(kind)
                .iter()
                .map(move |(filter, matches)| (kind, filter, matches))
        })
    }
}

/// Serialize a `Filter -> MatchSet` map as an ordered list of entries.
///
/// JSON object keys must be strings, so the structural filter key becomes a field.
mod filter_entries {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Filter, FilterMatches, MatchSet};

    #[derive(Serialize)]
    struct EntryRef<'a> {
        filter: &'a Filter,
        matches: &'a MatchSet,
    }

    #[derive(Deserialize)]
    struct Entry {
        filter: Filter,
        matches: MatchSet,
    }

    pub fn serialize<S: Serializer>(map: &FilterMatches, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<EntryRef<'_>> = map
            .iter()
            .map(|(filter, matches)| EntryRef { filter, matches })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FilterMatches, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        let mut map = FilterMatches::new();
        for entry in entries {
            if map.insert(entry.filter, entry.matches).is_some() {
                return Err(D::Error::custom("duplicate filter entry"));
            }
        }
        Ok(map)
    }
}

// ============================================================================
// Module Metadata
// ============================================================================

/// One module's exported query surface.
///
/// Written once per module build and read-only thereafter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Name of the module that produced it.
    pub module: String,
    /// Packages the module's files declare.
    #[serde(default)]
    pub packages: BTreeSet<String>,
    /// Local match results per query.
    #[serde(default)]
    pub uses: Uses,
    /// Flattened supertypes of every class and object the module declares.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hierarchy: BTreeMap<Name, BTreeSet<Name>>,
}

impl ModuleMetadata {
    /// Empty metadata for a module.
    pub fn new(module: impl Into<String>) -> Self {
        ModuleMetadata {
            module: module.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
